//! booking.rs
//!
//! The booking engine orchestrates a booking attempt end to end:
//! validate the event, validate the seats, validate capacity, persist,
//! update counters, invalidate caches. The optimistic seat check gives
//! precise early errors; the store's atomic insert is what actually
//! guarantees that of two racing claims on one seat only one lands.

use crate::cache::{self, CacheService};
use crate::catalog::{self, EventCatalog};
use crate::config::CacheConfig;
use crate::error::{CoreError, CoreResult};
use crate::ledger::{seat_labels, SeatLedger};
use crate::models::{Booking, PaymentStatus, User};
use crate::services::notifier::{BookingNotification, Notifier};
use crate::services::payment::PaymentGateway;
use crate::store::DurableStore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Availability of one seat in the venue grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatAvailability {
    pub seat_number: String,
    pub is_available: bool,
}

/// Snapshot of an event's seating for display: the grid, the counters
/// and the price a buyer would pay right now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatMap {
    pub event_id: Uuid,
    pub seats: Vec<SeatAvailability>,
    pub total_seats: i32,
    pub sold_tickets: i32,
    pub current_price: f64,
}

#[derive(Clone)]
pub struct BookingEngine {
    store: Arc<dyn DurableStore>,
    catalog: EventCatalog,
    ledger: SeatLedger,
    cache: CacheService,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    seat_map_ttl: Duration,
    user_bookings_ttl: Duration,
}

impl BookingEngine {
    pub fn new(
        store: Arc<dyn DurableStore>,
        cache: CacheService,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        config: &CacheConfig,
    ) -> Self {
        BookingEngine {
            catalog: EventCatalog::new(store.clone(), cache.clone()),
            ledger: SeatLedger::new(store.clone()),
            store,
            cache,
            gateway,
            notifier,
            seat_map_ttl: Duration::from_secs(config.seat_map_ttl_secs),
            user_bookings_ttl: Duration::from_secs(config.user_bookings_ttl_secs),
        }
    }

    pub fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &SeatLedger {
        &self.ledger
    }

    /// Book one seat. The ticket price is the event's current dynamic
    /// price at this instant, frozen into the booking.
    pub async fn book_single(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        seat_number: &str,
    ) -> CoreResult<Booking> {
        let seat = seat_number.trim();
        if seat.is_empty() {
            return Err(CoreError::InvalidInput("seat number is empty".into()));
        }
        let mut bookings = self
            .book_batch(event_id, user_id, vec![seat.to_string()])
            .await?;
        Ok(bookings.remove(0))
    }

    /// Book several seats in one attempt, all-or-nothing. Every seat in
    /// the batch gets the same price snapshot: the price depends on
    /// available seats, which are not decremented mid-batch.
    pub async fn book_bulk(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        seat_numbers: Vec<String>,
    ) -> CoreResult<Vec<Booking>> {
        // trim first so " A1" and "A1" are the same seat everywhere below
        let seat_numbers: Vec<String> = seat_numbers
            .into_iter()
            .map(|s| s.trim().to_string())
            .collect();
        if seat_numbers.is_empty() {
            return Err(CoreError::InvalidInput("no seats selected".into()));
        }
        if seat_numbers.iter().any(|s| s.is_empty()) {
            return Err(CoreError::InvalidInput("seat number is empty".into()));
        }
        let unique: HashSet<&str> = seat_numbers.iter().map(|s| s.as_str()).collect();
        if unique.len() != seat_numbers.len() {
            return Err(CoreError::InvalidInput(
                "duplicate seats in request".into(),
            ));
        }
        self.book_batch(event_id, user_id, seat_numbers).await
    }

    async fn book_batch(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        seat_numbers: Vec<String>,
    ) -> CoreResult<Vec<Booking>> {
        // VALIDATE_EVENT: read the store directly - the price snapshot
        // must come from live counters, not a cached copy.
        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or(CoreError::EventNotFound)?;

        // VALIDATE_SEATS: optimistic, reports every collision at once
        self.ledger.claim(event_id, &seat_numbers).await?;

        // VALIDATE_CAPACITY: against the whole batch
        let available = catalog::available_seats(&event)?;
        if seat_numbers.len() as i32 > available {
            return Err(CoreError::SoldOut);
        }

        let price = event.current_price();
        let bookings: Vec<Booking> = seat_numbers
            .into_iter()
            .map(|seat| Booking::new(event_id, user_id, seat, price))
            .collect();

        // PERSIST + UPDATE_COUNTERS: one atomic store call. A concurrent
        // claim that slipped past the optimistic check fails here.
        self.store.create_bookings(event_id, &bookings).await?;

        // INVALIDATE_CACHE: synchronously, before returning, so staleness
        // is bounded to reads already in flight.
        self.cache.invalidate_event(&event_id);
        self.cache.invalidate_user_bookings(&user_id);

        info!(
            "booked {} seat(s) for user {} on event {} at {:.2} each",
            bookings.len(),
            user_id,
            event_id,
            price
        );
        Ok(bookings)
    }

    /// Settle payment for a booking with a single outcome draw.
    ///
    /// Not idempotent: a second call re-draws the outcome and can flip
    /// the payment status again. Callers must prevent double settlement.
    pub async fn settle_payment(
        &self,
        booking_id: Uuid,
        requester_id: Uuid,
    ) -> CoreResult<Booking> {
        let mut booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or(CoreError::BookingNotFound)?;

        if booking.user_id != requester_id {
            return Err(CoreError::Unauthorized);
        }

        let paid = self.gateway.charge(&booking).await?;
        booking.payment_status = if paid {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Failed
        };
        self.store.update_booking(&booking).await?;

        if paid {
            self.send_confirmation(&booking).await;
            self.cache.invalidate_user_bookings(&booking.user_id);
            info!("payment completed for booking {}", booking_id);
        } else {
            info!("payment failed for booking {}", booking_id);
        }

        Ok(booking)
    }

    /// Fire-and-forget confirmation. Lookup or delivery failures are
    /// logged and never affect the already-committed payment state.
    async fn send_confirmation(&self, booking: &Booking) {
        let user = match self.store.get_user(booking.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!("no profile for user {}, skipping confirmation", booking.user_id);
                return;
            }
            Err(e) => {
                warn!("user lookup failed for confirmation: {}", e);
                return;
            }
        };
        let event = match self.store.get_event(booking.event_id).await {
            Ok(Some(event)) => event,
            Ok(None) => {
                warn!("event {} vanished, skipping confirmation", booking.event_id);
                return;
            }
            Err(e) => {
                warn!("event lookup failed for confirmation: {}", e);
                return;
            }
        };

        let notification = BookingNotification {
            user_email: user.email,
            user_name: user.name,
            event_name: event.name,
            seat_number: booking.seat_number.clone(),
            price: booking.ticket_price,
            confirmation_token: booking.confirmation_token.clone(),
            date: event.date,
            time: event.time,
            venue: event.venue,
        };
        if let Err(e) = self.notifier.notify_booking_confirmed(&notification).await {
            warn!("confirmation notification failed: {}", e);
        }
    }

    /// Availability grid for an event, cache-through with a short TTL.
    pub async fn seat_map(&self, event_id: Uuid) -> CoreResult<SeatMap> {
        let key = cache::bookings::key_available_seats(&event_id);
        if let Some(map) = self.cache.bookings.get::<SeatMap>(&key) {
            return Ok(map);
        }

        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or(CoreError::EventNotFound)?;
        let occupied = self.ledger.list_occupied(event_id).await?;

        let seats = seat_labels(event.total_seats)
            .into_iter()
            .map(|seat_number| {
                let is_available = !occupied.contains(&seat_number);
                SeatAvailability {
                    seat_number,
                    is_available,
                }
            })
            .collect();

        let map = SeatMap {
            event_id,
            seats,
            total_seats: event.total_seats,
            sold_tickets: event.sold_tickets,
            current_price: event.current_price(),
        };
        self.cache.bookings.set_with_ttl(&key, &map, self.seat_map_ttl);
        Ok(map)
    }

    /// A user's bookings, newest first, cache-through.
    pub async fn user_bookings(&self, user_id: Uuid) -> CoreResult<Vec<Booking>> {
        if let Some(bookings) = self.cache.get_cached_user_bookings(&user_id) {
            return Ok(bookings);
        }

        let bookings = self.store.bookings_for_user(user_id).await?;
        self.cache.bookings.set_with_ttl(
            &cache::bookings::key_user_bookings(&user_id),
            &bookings,
            self.user_bookings_ttl,
        );
        Ok(bookings)
    }

    /// A user's profile, cache-through via the profile pool.
    pub async fn user_profile(&self, user_id: Uuid) -> CoreResult<Option<User>> {
        if let Some(user) = self.cache.get_cached_user_profile(&user_id) {
            return Ok(Some(user));
        }

        let user = self.store.get_user(user_id).await?;
        if let Some(ref user) = user {
            self.cache.cache_user_profile(user);
        }
        Ok(user)
    }
}
