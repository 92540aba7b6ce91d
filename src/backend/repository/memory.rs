//! In-memory repository used when no database is configured.
//!
//! Data lives for the lifetime of the process only.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{MessageRepository, RepositoryError, StoredMessage, User, UserRepository};
use crate::shared::UserId;

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    messages: Vec<StoredMessage>,
}

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
    failing: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail, as if the database were down.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn message_count(&self) -> usize {
        self.tables.read().messages.len()
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("in-memory repository set to fail".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn get_user(&self, id: UserId) -> Result<User, RepositoryError> {
        self.check()?;
        self.tables
            .read()
            .users
            .iter()
            .find(|user| user.id == id)
            .cloned()
            .ok_or(RepositoryError::NotFound("user"))
    }

    async fn create_user(&self, username: &str) -> Result<UserId, RepositoryError> {
        self.check()?;
        let mut tables = self.tables.write();
        if tables.users.iter().any(|user| user.username == username) {
            return Err(RepositoryError::AlreadyExists("user"));
        }
        let id = tables.users.len() as UserId + 1;
        tables.users.push(User {
            id,
            username: username.to_string(),
        });
        Ok(id)
    }
}

#[async_trait]
impl MessageRepository for InMemoryRepository {
    async fn create_message(
        &self,
        from: UserId,
        to: UserId,
        text: &str,
    ) -> Result<i64, RepositoryError> {
        self.check()?;
        let mut tables = self.tables.write();
        let id = tables.messages.len() as i64 + 1;
        tables.messages.push(StoredMessage {
            id,
            from_id: from,
            to_id: to,
            message: text.to_string(),
            stored_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list_messages(
        &self,
        from: UserId,
        to: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        self.check()?;
        Ok(self
            .tables
            .read()
            .messages
            .iter()
            .filter(|m| m.from_id == from && m.to_id == to && m.stored_at > since)
            .cloned()
            .collect())
    }
}
