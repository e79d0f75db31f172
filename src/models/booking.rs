use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "cancelled" => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Active,
    Cancelled,
    Refunded,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Active => "active",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(BookingStatus::Active),
            "cancelled" => Some(BookingStatus::Cancelled),
            "refunded" => Some(BookingStatus::Refunded),
            _ => None,
        }
    }
}

/// Identity fields embedded in the confirmation token. The token is a
/// scannable proof-of-booking artifact, not a credential: it is plain
/// base64 over JSON and decodes back to this payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationPayload {
    pub booking_id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub seat_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub seat_number: String,
    /// Price locked in at booking time - not re-evaluated later.
    pub ticket_price: f64,
    pub payment_status: PaymentStatus,
    pub status: BookingStatus,
    pub confirmation_token: String,
    pub booked_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(event_id: Uuid, user_id: Uuid, seat_number: String, ticket_price: f64) -> Self {
        let id = Uuid::new_v4();
        let confirmation_token = encode_confirmation_token(&ConfirmationPayload {
            booking_id: id,
            event_id,
            user_id,
            seat_number: seat_number.clone(),
        });
        Booking {
            id,
            event_id,
            user_id,
            seat_number,
            ticket_price,
            payment_status: PaymentStatus::Pending,
            status: BookingStatus::Active,
            confirmation_token,
            booked_at: Utc::now(),
        }
    }

    /// Only active bookings count against seat availability.
    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Active
    }
}

pub fn encode_confirmation_token(payload: &ConfirmationPayload) -> String {
    // serde_json cannot fail on this payload shape
    let json = serde_json::to_string(payload).unwrap_or_default();
    general_purpose::STANDARD.encode(json)
}

pub fn decode_confirmation_token(token: &str) -> Option<ConfirmationPayload> {
    let bytes = general_purpose::STANDARD.decode(token).ok()?;
    serde_json::from_slice(&bytes).ok()
}
