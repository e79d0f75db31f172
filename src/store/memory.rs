//! In-memory store, used by tests and single-process deployments.
//!
//! A single mutex around the maps makes `create_bookings` the
//! linearization point for concurrent claims: of N simultaneous attempts
//! on the same seat, exactly one observes it free.

use super::DurableStore;
use crate::catalog;
use crate::error::{CoreError, CoreResult};
use crate::models::{Booking, Event, User};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    events: HashMap<Uuid, Event>,
    bookings: HashMap<Uuid, Booking>,
    users: HashMap<Uuid, User>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn insert_event(&self, event: &Event) -> CoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn get_event(&self, event_id: Uuid) -> CoreResult<Option<Event>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.events.get(&event_id).cloned())
    }

    async fn update_event(&self, event: &Event) -> CoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let current = inner
            .events
            .get(&event.id)
            .ok_or(CoreError::EventNotFound)?;

        // seat counters are owned by create_bookings; an update carries
        // detail fields only and must not roll the counters back
        let mut updated = event.clone();
        updated.total_seats = current.total_seats;
        updated.sold_tickets = current.sold_tickets;
        updated.revenue = current.revenue;

        inner.events.insert(event.id, updated);
        Ok(())
    }

    async fn list_events(&self) -> CoreResult<Vec<Event>> {
        let inner = self.inner.lock().unwrap();
        let mut events: Vec<Event> = inner.events.values().cloned().collect();
        events.sort_by(|a, b| (a.date, a.time).cmp(&(b.date, b.time)));
        Ok(events)
    }

    async fn insert_user(&self, user: &User) -> CoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> CoreResult<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.get(&user_id).cloned())
    }

    async fn get_booking(&self, booking_id: Uuid) -> CoreResult<Option<Booking>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.bookings.get(&booking_id).cloned())
    }

    async fn bookings_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Booking>> {
        let inner = self.inner.lock().unwrap();
        let mut bookings: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.booked_at.cmp(&a.booked_at));
        Ok(bookings)
    }

    async fn active_seats(&self, event_id: Uuid) -> CoreResult<HashSet<String>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .bookings
            .values()
            .filter(|b| b.event_id == event_id && b.is_active())
            .map(|b| b.seat_number.clone())
            .collect())
    }

    async fn update_booking(&self, booking: &Booking) -> CoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.bookings.contains_key(&booking.id) {
            return Err(CoreError::BookingNotFound);
        }
        inner.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn create_bookings(&self, event_id: Uuid, bookings: &[Booking]) -> CoreResult<Event> {
        let mut inner = self.inner.lock().unwrap();

        let event = inner
            .events
            .get(&event_id)
            .cloned()
            .ok_or(CoreError::EventNotFound)?;

        let occupied: HashSet<&str> = inner
            .bookings
            .values()
            .filter(|b| b.event_id == event_id && b.is_active())
            .map(|b| b.seat_number.as_str())
            .collect();

        let mut conflicts: Vec<String> = bookings
            .iter()
            .filter(|b| occupied.contains(b.seat_number.as_str()))
            .map(|b| b.seat_number.clone())
            .collect();
        if !conflicts.is_empty() {
            conflicts.sort();
            return Err(CoreError::SeatConflict(conflicts));
        }

        let count = bookings.len() as i32;
        if event.sold_tickets + count > event.total_seats {
            return Err(CoreError::SoldOut);
        }

        let updated = catalog::record_sale(&event, count)?;
        for booking in bookings {
            inner.bookings.insert(booking.id, booking.clone());
        }
        inner.events.insert(event_id, updated.clone());

        Ok(updated)
    }
}
