use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Opaque token proving the holder received the registration email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct VerificationToken {
    pub user_id: Uuid,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

impl VerificationToken {
    pub fn new(user_id: Uuid, token: String) -> Self {
        Self {
            user_id,
            token,
            created_at: Utc::now(),
        }
    }

    /// A token never expires unless a TTL is configured.
    pub fn is_expired(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
        match ttl {
            Some(ttl) => now - self.created_at > ttl,
            None => false,
        }
    }
}
