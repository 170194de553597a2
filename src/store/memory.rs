use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{NewUser, UserRecord, UserStore};
use crate::auth::TokenVersion;
use crate::error::StoreError;

/// Process-local store for tests and local runs
///
/// Every operation takes the lock once, so the counter bump is a single
/// read-modify-write.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, UserRecord>>, StoreError> {
        self.users
            .lock()
            .map_err(|_| StoreError::Unexpected("user map lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.lock()?;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        let users = self.lock()?;
        Ok(users.get(&id).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<UserRecord, StoreError> {
        let mut users = self.lock()?;
        if users.values().any(|u| u.username == new_user.username) {
            return Err(StoreError::UniqueViolation(format!(
                "username {} already taken",
                new_user.username
            )));
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            token_version: TokenVersion::INITIAL,
            created_at: Utc::now(),
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn increment_token_version(&self, id: Uuid) -> Result<TokenVersion, StoreError> {
        let mut users = self.lock()?;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))?;
        user.token_version = user.token_version.next();
        Ok(user.token_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: "$2b$04$digest".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = InMemoryUserStore::new();
        let created = store.create(new_user("bob")).await.unwrap();

        assert_eq!(created.token_version, TokenVersion::INITIAL);

        let by_name = store.find_by_username("bob").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);

        let by_id = store.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "bob");

        assert!(store.find_by_username("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let store = InMemoryUserStore::new();
        store.create(new_user("bob")).await.unwrap();

        let result = store.create(new_user("bob")).await;
        assert!(matches!(result, Err(StoreError::UniqueViolation(_))));
    }

    #[tokio::test]
    async fn test_increment_unknown_user() {
        let store = InMemoryUserStore::new();
        let result = store.increment_token_version(Uuid::new_v4()).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(InMemoryUserStore::new());
        let user = store.create(new_user("bob")).await.unwrap();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment_token_version(user.id).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let user = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(user.token_version, TokenVersion::new(50));
    }
}
