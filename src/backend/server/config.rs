/**
 * Server Service Loading
 *
 * Turns the connection settings of `AppConfig` into live services.
 *
 * # Optional Services
 *
 * - **Database**: without `DATABASE_URL` the server runs on the in-memory
 *   repository. A configured database that cannot be reached or migrated is
 *   fatal: acking messages that only live in memory would lose them.
 * - **Key/value store**: without `REDIS_ADDR` the in-memory store is used and
 *   the process runs as a single node. A configured store that cannot be
 *   reached is fatal, since the directory and identity lease depend on it.
 */

use std::sync::Arc;

use sqlx::migrate::MigrateError;
use sqlx::PgPool;
use thiserror::Error;

use crate::backend::repository::{InMemoryRepository, MessageRepository, PgRepository, UserRepository};
use crate::backend::store::{KvStore, MemoryStore, RedisStore, StoreError};

/// Database configuration result
pub type DatabaseConfig = Option<PgPool>;

/// A configured database that could not be brought up.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("failed to connect to database: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("failed to run database migrations: {0}")]
    Migrate(#[from] MigrateError),
}

/// Repositories used by the handlers, whichever backend serves them.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub messages: Arc<dyn MessageRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        Self {
            users: repo.clone(),
            messages: repo,
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        let repo = Arc::new(PgRepository::new(pool));
        Self {
            users: repo.clone(),
            messages: repo,
        }
    }
}

/// Connect to Postgres and run migrations.
///
/// Returns `Ok(None)` only when no URL is configured.
pub async fn load_database(database_url: Option<&str>) -> Result<DatabaseConfig, DatabaseError> {
    let Some(database_url) = database_url else {
        tracing::warn!("DATABASE_URL not set. Using the in-memory repository.");
        return Ok(None);
    };

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(database_url).await.map_err(|e| {
        tracing::error!("Failed to create database connection pool: {:?}", e);
        e
    })?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!().run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run database migrations: {}", e);
        e
    })?;
    tracing::info!("Database migrations completed successfully");

    Ok(Some(pool))
}

/// Load the repositories, preferring Postgres when configured.
pub async fn load_repositories(database_url: Option<&str>) -> Result<Repositories, DatabaseError> {
    Ok(match load_database(database_url).await? {
        Some(pool) => Repositories::postgres(pool),
        None => Repositories::in_memory(),
    })
}

/// Connect to the shared key/value store.
pub async fn load_store(redis_addr: Option<&str>) -> Result<Arc<dyn KvStore>, StoreError> {
    let Some(addr) = redis_addr else {
        tracing::warn!("REDIS_ADDR not set. Using the in-memory store (single-node mode).");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let store = RedisStore::connect(addr).await?;
    store.ping().await?;
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_missing_services_fall_back_to_memory() {
        let store = load_store(None).await.unwrap();
        store.ping().await.unwrap();

        let repos = load_repositories(None).await.unwrap();
        let id = repos.users.create_user("alice").await.unwrap();
        assert_eq!(repos.users.get_user(id).await.unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_configured_but_unusable_database_is_an_error() {
        let result = load_repositories(Some("not a database url")).await;
        assert_matches!(result.err(), Some(DatabaseError::Connect(_)));
    }
}
