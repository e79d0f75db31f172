//! Event catalog: event records, availability and pricing.
//!
//! The pure counter rule lives in [`record_sale`] so both store
//! implementations and the tests share one definition of what a sale does
//! to an event.

use crate::cache::CacheService;
use crate::error::{CoreError, CoreResult};
use crate::models::{DynamicPricing, Event};
use crate::store::DurableStore;
use chrono::{NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Apply a sale of `count` tickets to an event, returning the updated
/// record. Revenue is recomputed as `sold_tickets * base_price` - the
/// base price, not the dynamic one. That mirrors the billing behavior
/// this core replaces and is kept for compatibility.
pub fn record_sale(event: &Event, count: i32) -> CoreResult<Event> {
    if count <= 0 {
        return Err(CoreError::InvalidInput(
            "sale count must be positive".into(),
        ));
    }
    if event.sold_tickets + count > event.total_seats {
        return Err(CoreError::CapacityExceeded {
            requested: count,
            available: event.available_seats(),
        });
    }

    let mut updated = event.clone();
    updated.sold_tickets += count;
    updated.revenue = updated.sold_tickets as f64 * updated.base_price;
    Ok(updated)
}

/// Remaining seat count, with a defensive check against counter
/// corruption.
pub fn available_seats(event: &Event) -> CoreResult<i32> {
    let available = event.available_seats();
    if available < 0 {
        return Err(CoreError::InvalidState(format!(
            "event {} has {} sold tickets but only {} seats",
            event.id, event.sold_tickets, event.total_seats
        )));
    }
    Ok(available)
}

/// Parameters for creating an event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub name: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub venue: String,
    pub category: String,
    pub total_seats: i32,
    pub base_price: f64,
    pub pricing: DynamicPricing,
}

/// Fields an organizer may change after creation. `None` leaves the
/// field untouched.
#[derive(Debug, Clone, Default)]
pub struct EventUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub venue: Option<String>,
    pub category: Option<String>,
    pub base_price: Option<f64>,
    pub pricing: Option<DynamicPricing>,
}

/// Listing filters; doubles as the cache key for filter-keyed list
/// results.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    /// Case-insensitive substring match over name and description.
    pub search: Option<String>,
}

impl EventFilter {
    pub fn cache_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.category.as_deref().unwrap_or("all"),
            self.date.map(|d| d.to_string()).unwrap_or_else(|| "all".into()),
            self.search
                .as_deref()
                .map(str::to_lowercase)
                .unwrap_or_else(|| "all".into()),
        )
    }

    fn matches(&self, event: &Event) -> bool {
        if let Some(ref category) = self.category {
            if &event.category != category {
                return false;
            }
        }
        if let Some(date) = self.date {
            if event.date != date {
                return false;
            }
        }
        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            if !event.name.to_lowercase().contains(&needle)
                && !event.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

#[derive(Clone)]
pub struct EventCatalog {
    store: Arc<dyn DurableStore>,
    cache: CacheService,
}

impl EventCatalog {
    pub fn new(store: Arc<dyn DurableStore>, cache: CacheService) -> Self {
        EventCatalog { store, cache }
    }

    /// Cache-through single-event read.
    pub async fn event_by_id(&self, event_id: Uuid) -> CoreResult<Event> {
        if let Some(event) = self.cache.get_cached_event(&event_id) {
            return Ok(event);
        }

        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or(CoreError::EventNotFound)?;
        self.cache.cache_event(&event);
        Ok(event)
    }

    /// Cache-through filtered listing. Results are keyed by the filter,
    /// which is why mutations flush the whole event pool.
    pub async fn list_events(&self, filter: &EventFilter) -> CoreResult<Vec<Event>> {
        let key = filter.cache_key();
        if let Some(events) = self.cache.get_cached_event_list(&key) {
            return Ok(events);
        }

        let events: Vec<Event> = self
            .store
            .list_events()
            .await?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect();
        self.cache.cache_event_list(&key, &events);
        Ok(events)
    }

    /// Events dated strictly after today.
    pub async fn upcoming_events(&self) -> CoreResult<Vec<Event>> {
        if let Some(events) = self.cache.get_cached_upcoming_events() {
            return Ok(events);
        }

        let today = Utc::now().date_naive();
        let events: Vec<Event> = self
            .store
            .list_events()
            .await?
            .into_iter()
            .filter(|e| e.date > today)
            .collect();
        self.cache.cache_upcoming_events(&events);
        Ok(events)
    }

    /// Events owned by one organizer, cache-through. Entries live in the
    /// event pool, so any event mutation invalidates them with the rest.
    pub async fn organizer_events(&self, organizer_id: Uuid) -> CoreResult<Vec<Event>> {
        if let Some(events) = self.cache.get_cached_organizer_events(&organizer_id) {
            return Ok(events);
        }

        let events: Vec<Event> = self
            .store
            .list_events()
            .await?
            .into_iter()
            .filter(|e| e.organizer_id == organizer_id)
            .collect();
        self.cache.cache_organizer_events(&organizer_id, &events);
        Ok(events)
    }

    pub async fn create_event(&self, organizer_id: Uuid, new: NewEvent) -> CoreResult<Event> {
        if new.total_seats <= 0 {
            return Err(CoreError::InvalidInput("total_seats must be positive".into()));
        }
        if new.base_price < 0.0 {
            return Err(CoreError::InvalidInput("base_price cannot be negative".into()));
        }

        let event = Event {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            date: new.date,
            time: new.time,
            venue: new.venue,
            category: new.category,
            total_seats: new.total_seats,
            base_price: new.base_price,
            pricing: new.pricing,
            sold_tickets: 0,
            revenue: 0.0,
            organizer_id,
            created_at: Utc::now(),
        };
        self.store.insert_event(&event).await?;

        self.cache.invalidate_event(&event.id);
        info!("event {} created by organizer {}", event.id, organizer_id);
        Ok(event)
    }

    /// Organizer-only update of event details. Seat counters are owned by
    /// the booking engine and cannot be touched here.
    pub async fn update_event(
        &self,
        event_id: Uuid,
        actor_id: Uuid,
        update: EventUpdate,
    ) -> CoreResult<Event> {
        let mut event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or(CoreError::EventNotFound)?;

        if event.organizer_id != actor_id {
            return Err(CoreError::Unauthorized);
        }

        if let Some(name) = update.name {
            event.name = name;
        }
        if let Some(description) = update.description {
            event.description = description;
        }
        if let Some(date) = update.date {
            event.date = date;
        }
        if let Some(time) = update.time {
            event.time = time;
        }
        if let Some(venue) = update.venue {
            event.venue = venue;
        }
        if let Some(category) = update.category {
            event.category = category;
        }
        if let Some(base_price) = update.base_price {
            if base_price < 0.0 {
                return Err(CoreError::InvalidInput("base_price cannot be negative".into()));
            }
            event.base_price = base_price;
        }
        if let Some(pricing) = update.pricing {
            event.pricing = pricing;
        }

        self.store.update_event(&event).await?;

        self.cache.invalidate_event(&event_id);
        Ok(event)
    }
}
