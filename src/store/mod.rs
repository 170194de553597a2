/// User store
///
/// The auth core only talks to users through `UserStore`. The store owns the
/// rows; the core never writes a `UserRecord` back, it only asks for a new
/// user or for an atomic bump of the revocation counter.

mod memory;
mod postgres;

pub use memory::InMemoryUserStore;
pub use postgres::PostgresUserStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::auth::TokenVersion;
use crate::error::StoreError;

/// A stored user. Deliberately not `Serialize`; use `UserProfile` outward.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub token_version: TokenVersion,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"[redacted]")
            .field("token_version", &self.token_version)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Input for `UserStore::create`. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Public projection of a user, without the digest
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserProfile {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username.clone(),
            email: record.email.clone(),
            created_at: record.created_at,
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError>;

    /// Creates a user with `token_version = 0`.
    ///
    /// Fails with `StoreError::UniqueViolation` if the username is taken.
    async fn create(&self, new_user: NewUser) -> Result<UserRecord, StoreError>;

    /// Atomically adds one to the user's revocation counter and returns the
    /// new value. Must be a single read-modify-write at the store.
    ///
    /// Fails with `StoreError::NotFound` for an unknown user.
    async fn increment_token_version(&self, id: Uuid) -> Result<TokenVersion, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            username: "bob".to_string(),
            email: "bob@x.com".to_string(),
            password_hash: "$2b$10$secretdigest".to_string(),
            token_version: TokenVersion::INITIAL,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_profile_has_no_digest() {
        let record = record();
        let json = serde_json::to_value(UserProfile::from(&record)).unwrap();

        assert_eq!(json["username"], "bob");
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("secretdigest"));
    }

    #[test]
    fn test_debug_redacts_digest() {
        let rendered = format!("{:?}", record());
        assert!(!rendered.contains("secretdigest"));
        assert!(rendered.contains("[redacted]"));
    }
}
