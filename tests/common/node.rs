//! Backend nodes for integration tests.
//!
//! Each node binds an ephemeral port, advertises it as its address, and runs
//! the real router with `axum::serve`. Nodes built from the same
//! `MemoryStore` and repository behave like a cluster sharing redis and
//! Postgres.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chatrelay::backend::repository::{InMemoryRepository, UserRepository};
use chatrelay::backend::server::config::Repositories;
use chatrelay::backend::server::{build_app, App, AppState};
use chatrelay::backend::store::{KvStore, MemoryStore};
use chatrelay::shared::{AppConfig, AppConfigBuilder, UserId};
use tokio::task::JoinHandle;

/// Short timings so liveness behaviour is observable within a test.
pub fn fast_config() -> AppConfigBuilder {
    AppConfig::builder()
        .ping_period(Duration::from_millis(200))
        .read_wait(Duration::from_millis(1_000))
        .write_wait(Duration::from_millis(1_000))
        .directory_ttl(Duration::from_secs(5))
        .identity_ttl(Duration::from_secs(30))
        .delivery_timeout(Duration::from_millis(1_000))
        .redirect_timeout(Duration::from_millis(200))
}

/// Services shared by every node of a test cluster.
#[derive(Clone, Default)]
pub struct Cluster {
    pub store: MemoryStore,
    pub repo: Arc<InMemoryRepository>,
}

impl Cluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user(&self, name: &str) -> UserId {
        self.repo.create_user(name).await.unwrap()
    }

    pub async fn node(&self) -> TestNode {
        self.node_with(fast_config()).await
    }

    pub async fn node_with(&self, config: AppConfigBuilder) -> TestNode {
        self.node_on(Arc::new(self.store.clone()), config).await
    }

    /// Node over a store of the caller's choosing, sharing the repository.
    pub async fn node_on(&self, store: Arc<dyn KvStore>, config: AppConfigBuilder) -> TestNode {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = config.advertise_addr(addr.to_string()).build().unwrap();

        let repositories = Repositories {
            users: self.repo.clone(),
            messages: self.repo.clone(),
        };
        let app = build_app(config, store, repositories)
            .await
            .unwrap();

        let routes = app.routes.clone();
        let shutdown = app.state.shutdown.clone();
        let server = tokio::spawn(async move {
            axum::serve(listener, routes)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .unwrap();
        });

        TestNode { addr, app, server }
    }
}

pub struct TestNode {
    pub addr: SocketAddr,
    pub app: App,
    server: JoinHandle<()>,
}

impl TestNode {
    pub fn state(&self) -> &AppState {
        &self.app.state
    }

    pub fn ws_url(&self, user: impl std::fmt::Display, to: impl std::fmt::Display) -> String {
        format!("ws://{}/ws?user={}&to={}", self.addr, user, to)
    }

    pub fn is_local(&self, user: UserId) -> bool {
        self.app.state.registry.contains(user)
    }

    pub async fn stop(self) {
        self.app.shutdown(Duration::from_secs(2)).await;
        let _ = self.server.await;
    }
}
