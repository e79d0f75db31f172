//! Durable record store boundary.
//!
//! The core never does plain read-then-write against storage for seat
//! claims or counters. The one write the whole design leans on is
//! [`DurableStore::create_bookings`]: an atomic conditional insert that
//! enforces seat uniqueness and the sold-ticket bound in the same step.
//! The optimistic checks in the engine exist only to produce precise
//! errors early; this store call is the source of truth.

use crate::error::CoreResult;
use crate::models::{Booking, Event, User};
use async_trait::async_trait;
use std::collections::HashSet;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait DurableStore: Send + Sync {
    // === events ===
    async fn insert_event(&self, event: &Event) -> CoreResult<()>;
    async fn get_event(&self, event_id: Uuid) -> CoreResult<Option<Event>>;
    /// Update an event's detail fields. `total_seats`, `sold_tickets` and
    /// `revenue` are owned by `create_bookings` and are never written by
    /// this call, whatever the passed record carries.
    async fn update_event(&self, event: &Event) -> CoreResult<()>;
    async fn list_events(&self) -> CoreResult<Vec<Event>>;

    // === users ===
    async fn insert_user(&self, user: &User) -> CoreResult<()>;
    async fn get_user(&self, user_id: Uuid) -> CoreResult<Option<User>>;

    // === bookings ===
    async fn get_booking(&self, booking_id: Uuid) -> CoreResult<Option<Booking>>;
    async fn bookings_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Booking>>;
    /// Seat numbers held by active bookings for the event.
    async fn active_seats(&self, event_id: Uuid) -> CoreResult<HashSet<String>>;
    async fn update_booking(&self, booking: &Booking) -> CoreResult<()>;

    /// Persist a batch of bookings for one event, all-or-nothing.
    ///
    /// Atomically verifies that no requested seat has an active booking
    /// and that `sold_tickets + n <= total_seats`, inserts every booking,
    /// bumps the sold counter (revenue recomputed from base price) and
    /// returns the updated event.
    ///
    /// Errors: `EventNotFound`, `SeatConflict` naming every colliding
    /// seat, `SoldOut` when the batch exceeds remaining capacity.
    async fn create_bookings(&self, event_id: Uuid, bookings: &[Booking]) -> CoreResult<Event>;
}
