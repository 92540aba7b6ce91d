//! Persistence Collaborators
//!
//! Users and messages are owned by a relational store. The delivery core only
//! needs a handful of calls, expressed as two traits so the server can run
//! against Postgres in production and an in-process repository when no
//! database is configured (and in tests).
//!
//! # Module Structure
//!
//! ```text
//! repository/
//! ├── mod.rs       - Traits, models and RepositoryError
//! ├── postgres.rs  - sqlx / Postgres implementation
//! └── memory.rs    - In-memory implementation
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::UserId;

/// Postgres repository
pub mod postgres;

/// In-memory repository
pub mod memory;

pub use self::memory::InMemoryRepository;
pub use self::postgres::PgRepository;

/// Registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// Message as stored, returned by history queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub from_id: UserId,
    pub to_id: UserId,
    pub message: String,
    pub stored_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Fetch a user; `RepositoryError::NotFound` when the id is unknown.
    async fn get_user(&self, id: UserId) -> Result<User, RepositoryError>;

    /// Register `username`, returning the new id.
    async fn create_user(&self, username: &str) -> Result<UserId, RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync + 'static {
    /// Persist a message, returning its id.
    async fn create_message(
        &self,
        from: UserId,
        to: UserId,
        text: &str,
    ) -> Result<i64, RepositoryError>;

    /// Messages sent from `from` to `to` stored strictly after `since`,
    /// oldest first.
    async fn list_messages(
        &self,
        from: UserId,
        to: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<StoredMessage>, RepositoryError>;
}
