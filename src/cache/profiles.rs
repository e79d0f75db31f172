use super::CacheService;
use crate::models::User;

// === Key builders for the profile pool ===

pub fn key_user_profile(user_id: &uuid::Uuid) -> String {
    format!("user:{}", user_id)
}

impl CacheService {
    pub fn get_cached_user_profile(&self, user_id: &uuid::Uuid) -> Option<User> {
        self.profiles.get(&key_user_profile(user_id))
    }

    pub fn cache_user_profile(&self, user: &User) {
        self.profiles.set(&key_user_profile(&user.id), user);
    }
}
