//! Postgres-backed store.
//!
//! Seat uniqueness lives in the partial unique index on
//! `bookings(event_id, seat_number) WHERE status = 'active'`, and the
//! sold-ticket bound in a conditional `UPDATE`. `create_bookings` wraps
//! both in one transaction so a batch either lands whole or not at all.

use super::DurableStore;
use crate::database::Database;
use crate::error::{CoreError, CoreResult};
use crate::models::{
    Booking, BookingStatus, DynamicPricing, Event, PaymentStatus, User,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStore {
    db: Database,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        PgStore { db }
    }
}

#[derive(FromRow)]
struct EventRow {
    id: Uuid,
    name: String,
    description: String,
    date: NaiveDate,
    time: NaiveTime,
    venue: String,
    category: String,
    total_seats: i32,
    base_price: f64,
    pricing: Json<DynamicPricing>,
    sold_tickets: i32,
    revenue: f64,
    organizer_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            name: row.name,
            description: row.description,
            date: row.date,
            time: row.time,
            venue: row.venue,
            category: row.category,
            total_seats: row.total_seats,
            base_price: row.base_price,
            pricing: row.pricing.0,
            sold_tickets: row.sold_tickets,
            revenue: row.revenue,
            organizer_id: row.organizer_id,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct BookingRow {
    id: Uuid,
    event_id: Uuid,
    user_id: Uuid,
    seat_number: String,
    ticket_price: f64,
    payment_status: String,
    status: String,
    confirmation_token: String,
    booked_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = CoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let payment_status = PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
            CoreError::InvalidState(format!("unknown payment status '{}'", row.payment_status))
        })?;
        let status = BookingStatus::parse(&row.status).ok_or_else(|| {
            CoreError::InvalidState(format!("unknown booking status '{}'", row.status))
        })?;
        Ok(Booking {
            id: row.id,
            event_id: row.event_id,
            user_id: row.user_id,
            seat_number: row.seat_number,
            ticket_price: row.ticket_price,
            payment_status,
            status,
            confirmation_token: row.confirmation_token,
            booked_at: row.booked_at,
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    registered_at: DateTime<Utc>,
}

const EVENT_COLUMNS: &str = "id, name, description, date, time, venue, category, total_seats, \
     base_price, pricing, sold_tickets, revenue, organizer_id, created_at";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[async_trait]
impl DurableStore for PgStore {
    async fn insert_event(&self, event: &Event) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO events (id, name, description, date, time, venue, category, \
             total_seats, base_price, pricing, sold_tickets, revenue, organizer_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(event.id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.date)
        .bind(event.time)
        .bind(&event.venue)
        .bind(&event.category)
        .bind(event.total_seats)
        .bind(event.base_price)
        .bind(Json(&event.pricing))
        .bind(event.sold_tickets)
        .bind(event.revenue)
        .bind(event.organizer_id)
        .bind(event.created_at)
        .execute(&self.db.pool)
        .await
        .map_err(CoreError::transient)?;
        Ok(())
    }

    async fn get_event(&self, event_id: Uuid) -> CoreResult<Option<Event>> {
        let row: Option<EventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(event_id)
        .fetch_optional(&self.db.pool)
        .await
        .map_err(CoreError::transient)?;
        Ok(row.map(Event::from))
    }

    async fn update_event(&self, event: &Event) -> CoreResult<()> {
        // detail fields only: total_seats, sold_tickets and revenue are
        // written exclusively by create_bookings, so a stale read here
        // cannot roll a concurrent sale back
        let result = sqlx::query(
            "UPDATE events SET name = $2, description = $3, date = $4, time = $5, \
             venue = $6, category = $7, base_price = $8, pricing = $9 \
             WHERE id = $1",
        )
        .bind(event.id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.date)
        .bind(event.time)
        .bind(&event.venue)
        .bind(&event.category)
        .bind(event.base_price)
        .bind(Json(&event.pricing))
        .execute(&self.db.pool)
        .await
        .map_err(CoreError::transient)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::EventNotFound);
        }
        Ok(())
    }

    async fn list_events(&self) -> CoreResult<Vec<Event>> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY date, time"
        ))
        .fetch_all(&self.db.pool)
        .await
        .map_err(CoreError::transient)?;
        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn insert_user(&self, user: &User) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, registered_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.registered_at)
        .execute(&self.db.pool)
        .await
        .map_err(CoreError::transient)?;
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> CoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, name, email, registered_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db.pool)
        .await
        .map_err(CoreError::transient)?;
        Ok(row.map(|r| User {
            id: r.id,
            name: r.name,
            email: r.email,
            registered_at: r.registered_at,
        }))
    }

    async fn get_booking(&self, booking_id: Uuid) -> CoreResult<Option<Booking>> {
        let row: Option<BookingRow> = sqlx::query_as(
            "SELECT id, event_id, user_id, seat_number, ticket_price, payment_status, \
             status, confirmation_token, booked_at \
             FROM bookings WHERE id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&self.db.pool)
        .await
        .map_err(CoreError::transient)?;
        row.map(Booking::try_from).transpose()
    }

    async fn bookings_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(
            "SELECT id, event_id, user_id, seat_number, ticket_price, payment_status, \
             status, confirmation_token, booked_at \
             FROM bookings WHERE user_id = $1 ORDER BY booked_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await
        .map_err(CoreError::transient)?;
        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn active_seats(&self, event_id: Uuid) -> CoreResult<HashSet<String>> {
        let seats: Vec<String> = sqlx::query_scalar(
            "SELECT seat_number FROM bookings WHERE event_id = $1 AND status = 'active'",
        )
        .bind(event_id)
        .fetch_all(&self.db.pool)
        .await
        .map_err(CoreError::transient)?;
        Ok(seats.into_iter().collect())
    }

    async fn update_booking(&self, booking: &Booking) -> CoreResult<()> {
        let result = sqlx::query(
            "UPDATE bookings SET payment_status = $2, status = $3 WHERE id = $1",
        )
        .bind(booking.id)
        .bind(booking.payment_status.as_str())
        .bind(booking.status.as_str())
        .execute(&self.db.pool)
        .await
        .map_err(CoreError::transient)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::BookingNotFound);
        }
        Ok(())
    }

    async fn create_bookings(&self, event_id: Uuid, bookings: &[Booking]) -> CoreResult<Event> {
        let seat_numbers: Vec<String> =
            bookings.iter().map(|b| b.seat_number.clone()).collect();

        let mut tx = self.db.pool.begin().await.map_err(CoreError::transient)?;

        // Lock colliding active bookings so the conflict report is stable
        // for the rest of the transaction.
        let mut conflicts: Vec<String> = sqlx::query_scalar(
            "SELECT seat_number FROM bookings \
             WHERE event_id = $1 AND status = 'active' AND seat_number = ANY($2) \
             FOR UPDATE",
        )
        .bind(event_id)
        .bind(&seat_numbers)
        .fetch_all(&mut *tx)
        .await
        .map_err(CoreError::transient)?;

        if !conflicts.is_empty() {
            conflicts.sort();
            return Err(CoreError::SeatConflict(conflicts));
        }

        // Bounded counter update: fails the whole batch when capacity is
        // exceeded, and revenue is recomputed from the base price.
        let count = bookings.len() as i32;
        let updated: Option<EventRow> = sqlx::query_as(&format!(
            "UPDATE events \
             SET sold_tickets = sold_tickets + $2, \
                 revenue = (sold_tickets + $2) * base_price \
             WHERE id = $1 AND sold_tickets + $2 <= total_seats \
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(event_id)
        .bind(count)
        .fetch_optional(&mut *tx)
        .await
        .map_err(CoreError::transient)?;

        let updated = match updated {
            Some(row) => Event::from(row),
            None => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
                        .bind(event_id)
                        .fetch_one(&mut *tx)
                        .await
                        .map_err(CoreError::transient)?;
                return Err(if exists {
                    CoreError::SoldOut
                } else {
                    CoreError::EventNotFound
                });
            }
        };

        for booking in bookings {
            let result = sqlx::query(
                "INSERT INTO bookings (id, event_id, user_id, seat_number, ticket_price, \
                 payment_status, status, confirmation_token, booked_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(booking.id)
            .bind(booking.event_id)
            .bind(booking.user_id)
            .bind(&booking.seat_number)
            .bind(booking.ticket_price)
            .bind(booking.payment_status.as_str())
            .bind(booking.status.as_str())
            .bind(&booking.confirmation_token)
            .bind(booking.booked_at)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(_) => {}
                // A concurrent writer won the race after our check: the
                // partial unique index rejected the insert. Dropping the
                // transaction rolls everything back.
                Err(err) if is_unique_violation(&err) => {
                    return Err(CoreError::SeatConflict(vec![booking.seat_number.clone()]));
                }
                Err(err) => return Err(CoreError::transient(err)),
            }
        }

        tx.commit().await.map_err(CoreError::transient)?;
        Ok(updated)
    }
}
