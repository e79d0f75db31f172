use super::CacheService;
use crate::models::Booking;
use tracing::info;

// === Key builders for the booking pool ===

pub fn key_user_bookings(user_id: &uuid::Uuid) -> String {
    format!("bookings:user:{}", user_id)
}

pub fn key_event_bookings(event_id: &uuid::Uuid) -> String {
    format!("bookings:event:{}", event_id)
}

pub fn key_available_seats(event_id: &uuid::Uuid) -> String {
    format!("seats:available:{}", event_id)
}

impl CacheService {
    pub fn get_cached_user_bookings(&self, user_id: &uuid::Uuid) -> Option<Vec<Booking>> {
        self.bookings.get(&key_user_bookings(user_id))
    }

    pub fn invalidate_user_bookings(&self, user_id: &uuid::Uuid) {
        self.bookings.delete(&key_user_bookings(user_id));
        info!("invalidated booking cache for user {}", user_id);
    }
}
