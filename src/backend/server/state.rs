/**
 * Application State Management
 *
 * `AppState` is the central container handed to every Axum handler, with
 * `FromRef` implementations so handlers can extract just the part they need.
 *
 * # Contents
 *
 * - Configuration (timings, capacities)
 * - This process's backend identity lease
 * - Local channel registry, session directory and message router
 * - User and message repositories
 * - Server-wide shutdown token and the tracker of session/delivery tasks
 *
 * # Thread Safety
 *
 * Everything is behind `Arc` or is itself cheaply cloneable and
 * `Send + Sync`; cloning `AppState` never copies data.
 */

use std::sync::Arc;

use axum::extract::FromRef;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::backend::identity::{BackendIdentity, IdentityManager};
use crate::backend::realtime::{LocalChannelRegistry, MessageRouter, SessionDirectory};
use crate::backend::repository::{MessageRepository, UserRepository};
use crate::shared::AppConfig;

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,

    /// Identity lease held by this process
    pub identity: Arc<IdentityManager>,

    /// Users connected to this process
    pub registry: Arc<LocalChannelRegistry>,

    pub directory: SessionDirectory,

    pub router: Arc<MessageRouter>,

    pub users: Arc<dyn UserRepository>,

    pub messages: Arc<dyn MessageRepository>,

    /// Root of every session's cancellation scope
    ///
    /// Sessions derive child tokens from this one rather than from the upgrade
    /// request, so they outlive the handler that accepted them and end only on
    /// their own failure or on server shutdown.
    pub shutdown: CancellationToken,

    /// Sessions and detached delivery tasks, awaited on shutdown
    pub tasks: TaskTracker,
}

impl AppState {
    pub fn backend_id(&self) -> &BackendIdentity {
        self.identity.identity()
    }
}

impl FromRef<AppState> for Arc<LocalChannelRegistry> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.registry.clone()
    }
}

impl FromRef<AppState> for Arc<dyn UserRepository> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.users.clone()
    }
}

impl FromRef<AppState> for Arc<dyn MessageRepository> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.messages.clone()
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.config.clone()
    }
}
