/**
 * Server Initialization
 *
 * Builds the application: services, backend identity, shared state and the
 * Axum router.
 *
 * # Initialization Process
 *
 * 1. Validate configuration
 * 2. Connect to the key/value store (fatal when configured but unreachable)
 * 3. Load the repositories (Postgres when configured, fatal if unreachable)
 * 4. Acquire a unique backend identity and start lease renewal
 * 5. Create the registry, directory and router
 * 6. Create the HTTP router
 *
 * # Shutdown
 *
 * `App::shutdown` cancels the root token (ending every session), waits a
 * bounded time for session and delivery tasks, then stops lease renewal and
 * releases the identity.
 */

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::backend::identity::{IdentityError, IdentityManager};
use crate::backend::realtime::{LocalChannelRegistry, MessageRouter, SessionDirectory};
use crate::backend::routes::router::create_router;
use crate::backend::server::config::{load_repositories, load_store, DatabaseError, Repositories};
use crate::backend::server::state::AppState;
use crate::backend::store::{KvStore, StoreError};
use crate::shared::{AppConfig, ConfigError};

/// Failures that prevent the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("key/value store unreachable: {0}")]
    Store(#[from] StoreError),

    #[error("backend identity unavailable: {0}")]
    Identity(#[from] IdentityError),

    #[error("database unavailable: {0}")]
    Database(#[from] DatabaseError),
}

/// A built application: the HTTP routes and the state behind them.
pub struct App {
    pub routes: Router,
    pub state: AppState,
}

impl App {
    /// End every session, wait up to `grace` for in-flight tasks, then release
    /// the identity lease.
    pub async fn shutdown(&self, grace: Duration) {
        tracing::info!(
            backend_id = %self.state.backend_id(),
            sessions = self.state.registry.len(),
            "[Server] Shutting down"
        );

        self.state.shutdown.cancel();
        self.state.tasks.close();
        if tokio::time::timeout(grace, self.state.tasks.wait()).await.is_err() {
            tracing::warn!(
                remaining = self.state.tasks.len(),
                "[Server] Tasks still running after shutdown grace period"
            );
        }

        self.state.identity.shutdown().await;
    }
}

/// Create the application from configuration, connecting to the configured
/// services.
pub async fn create_app(config: AppConfig) -> Result<App, StartupError> {
    config.validate()?;

    let store = load_store(config.redis_addr.as_deref()).await?;
    let repositories = load_repositories(config.database_url.as_deref()).await?;

    build_app(config, store, repositories).await
}

/// Create the application over already-connected services.
pub async fn build_app(
    config: AppConfig,
    store: Arc<dyn KvStore>,
    repositories: Repositories,
) -> Result<App, StartupError> {
    tracing::info!("Initializing chatrelay backend");

    let identity = Arc::new(
        IdentityManager::acquire(
            store.clone(),
            config.advertised_addr(),
            config.identity_ttl(),
            config.identity.max_attempts,
        )
        .await?,
    );
    identity.start_renewal();

    let registry = Arc::new(LocalChannelRegistry::new(
        config.session.local_channel_capacity,
    ));
    let directory = SessionDirectory::new(store.clone());
    let router = Arc::new(MessageRouter::new(
        registry.clone(),
        directory.clone(),
        store,
        identity.identity().clone(),
        config.delivery_timeout(),
    ));

    let state = AppState {
        config: Arc::new(config),
        identity,
        registry,
        directory,
        router,
        users: repositories.users,
        messages: repositories.messages,
        shutdown: CancellationToken::new(),
        tasks: TaskTracker::new(),
    };

    let routes = create_router(state.clone());

    tracing::info!(backend_id = %state.backend_id(), "Router configured");

    Ok(App { routes, state })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::store::MemoryStore;
    use assert_matches::assert_matches;

    fn config() -> AppConfig {
        AppConfig::builder()
            .advertise_addr("127.0.0.1:1")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_build_app_acquires_identity() {
        let store = MemoryStore::new();
        let app = build_app(config(), Arc::new(store.clone()), Repositories::in_memory())
            .await
            .unwrap();

        let id = app.state.backend_id().as_str().to_string();
        assert_eq!(store.get(&id).await.unwrap().as_deref(), Some("127.0.0.1:1"));

        app.shutdown(Duration::from_secs(1)).await;
        assert!(app.state.shutdown.is_cancelled());
        assert_eq!(store.get(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreachable_store_is_fatal() {
        let store = MemoryStore::new();
        store.set_offline(true);

        let result = build_app(config(), Arc::new(store), Repositories::in_memory()).await;
        assert_matches!(
            result.err(),
            Some(StartupError::Identity(IdentityError::Store(_)))
        );
    }

    #[tokio::test]
    async fn test_unusable_database_url_is_fatal() {
        let config = AppConfig::builder()
            .advertise_addr("127.0.0.1:1")
            .database_url("not a database url")
            .build()
            .unwrap();

        let result = create_app(config).await;
        assert_matches!(result.err(), Some(StartupError::Database(_)));
    }
}
