//! In-process [`UserRepository`] for tests and local runs without Postgres.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{
    models::{NewUser, User},
    repo::{RepositoryError, UserRepository},
};

#[derive(Debug, Default)]
struct Store {
    next_id: i64,
    users: BTreeMap<i64, User>,
}

#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    store: RwLock<Store>,
}

impl MemoryUserRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut store = self.store.write().await;
        if store.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Duplicate);
        }

        store.next_id += 1;
        let now = Utc::now();
        let record = User {
            id: store.next_id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        store.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, RepositoryError> {
        let store = self.store.read().await;
        store
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_id(&self, id: i64) -> Result<User, RepositoryError> {
        let store = self.store.read().await;
        store.users.get(&id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn update(&self, user: &User) -> Result<User, RepositoryError> {
        let mut store = self.store.write().await;
        if store
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(RepositoryError::Duplicate);
        }

        let existing = store
            .users
            .get_mut(&user.id)
            .ok_or(RepositoryError::NotFound)?;
        existing.name.clone_from(&user.name);
        existing.email.clone_from(&user.email);
        existing.password_hash.clone_from(&user.password_hash);
        existing.updated_at = user.updated_at;
        Ok(existing.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        store
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let store = self.store.read().await;
        Ok(store.users.values().cloned().collect())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
