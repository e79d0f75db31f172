use super::CacheService;
use crate::models::Event;
use tracing::info;

// === Key builders for the event pool ===

pub fn key_event(event_id: &uuid::Uuid) -> String {
    format!("event:{}", event_id)
}

pub fn key_events_all(filters: &str) -> String {
    format!("events:all:{}", filters)
}

pub fn key_events_organizer(organizer_id: &uuid::Uuid) -> String {
    format!("events:organizer:{}", organizer_id)
}

pub fn key_events_upcoming() -> String {
    "events:upcoming".to_string()
}

impl CacheService {
    pub fn get_cached_event(&self, event_id: &uuid::Uuid) -> Option<Event> {
        self.events.get(&key_event(event_id))
    }

    pub fn cache_event(&self, event: &Event) {
        self.events.set(&key_event(&event.id), event);
    }

    pub fn get_cached_event_list(&self, filters: &str) -> Option<Vec<Event>> {
        self.events.get(&key_events_all(filters))
    }

    pub fn cache_event_list(&self, filters: &str, events: &[Event]) {
        self.events.set(&key_events_all(filters), &events);
    }

    pub fn get_cached_upcoming_events(&self) -> Option<Vec<Event>> {
        self.events.get(&key_events_upcoming())
    }

    pub fn cache_upcoming_events(&self, events: &[Event]) {
        self.events.set(&key_events_upcoming(), &events);
    }

    pub fn get_cached_organizer_events(&self, organizer_id: &uuid::Uuid) -> Option<Vec<Event>> {
        self.events.get(&key_events_organizer(organizer_id))
    }

    pub fn cache_organizer_events(&self, organizer_id: &uuid::Uuid, events: &[Event]) {
        self.events.set(&key_events_organizer(organizer_id), &events);
    }

    /// Invalidate everything that could be stale after a mutation of one
    /// event. List results are filter-keyed and not individually
    /// addressable, so the whole event pool is flushed; the flush also
    /// covers the single-event, upcoming and organizer entries.
    pub fn invalidate_event(&self, event_id: &uuid::Uuid) {
        // booking-pool entries derived from this event
        self.bookings.delete(&super::bookings::key_event_bookings(event_id));
        self.bookings.delete(&super::bookings::key_available_seats(event_id));

        self.events.flush();
        info!("invalidated event cache for event {}", event_id);
    }
}
