use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimal user profile. Authentication lives outside the core; this is
/// only what the notifier and the profile cache need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub registered_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        User {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            registered_at: Utc::now(),
        }
    }
}
