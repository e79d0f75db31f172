//! Booking confirmation notifications.
//!
//! Delivery (email or otherwise) is an external collaborator and strictly
//! best-effort: a failed notification is logged by the engine and never
//! rolls back the booking or payment state it follows.

use crate::error::CoreResult;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use tracing::info;

#[derive(Debug, Clone)]
pub struct BookingNotification {
    pub user_email: String,
    pub user_name: String,
    pub event_name: String,
    pub seat_number: String,
    pub price: f64,
    pub confirmation_token: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub venue: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_booking_confirmed(&self, notification: &BookingNotification) -> CoreResult<()>;
}

/// Production stand-in that records the confirmation in the log stream.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_booking_confirmed(&self, n: &BookingNotification) -> CoreResult<()> {
        info!(
            "booking confirmed: {} <{}> seat {} at '{}' ({} {}, {}) for {:.2}",
            n.user_name, n.user_email, n.seat_number, n.event_name, n.date, n.time, n.venue, n.price
        );
        Ok(())
    }
}
