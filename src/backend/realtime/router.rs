/**
 * Message Router
 *
 * Decides where a persisted message goes and hands it off, at most once:
 *
 * 1. **Local** - the recipient has a local channel in this process; the push is
 *    enqueued, racing the caller's cancellation and the delivery timeout.
 * 2. **Offline** - no directory entry; the message is silently dropped (it is
 *    already persisted and reachable through history).
 * 3. **Remote** - the directory names another backend; its identity lease gives
 *    the address and the message is POSTed to `/internal/redirect` there.
 *
 * Nothing is retried and the outcome is never reported back to the sender.
 * The returned `DeliveryOutcome` exists for logging and tests.
 */

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::backend::identity::BackendIdentity;
use crate::backend::realtime::directory::SessionDirectory;
use crate::backend::realtime::registry::{ChannelError, LocalChannelRegistry};
use crate::backend::store::KvStore;
use crate::shared::{MessageRedirect, OutboundPush, UserId};

/// Path of the redirect endpoint on every backend.
pub const REDIRECT_PATH: &str = "/internal/redirect";

/// Where a delivery ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Enqueued on a local channel
    Local,
    /// Accepted by the owning backend
    Redirected { owner: BackendIdentity },
    /// Recipient has no live connection anywhere
    Offline,
    /// Directory names this process but no local channel exists
    StaleSelfEntry,
    Failed(DeliveryFailure),
}

/// Why a delivery attempt was abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryFailure {
    #[error("local channel closed")]
    ChannelClosed,

    #[error("delivery timed out")]
    Timeout,

    #[error("delivery cancelled")]
    Cancelled,

    #[error("directory unavailable: {0}")]
    Directory(String),

    #[error("no lease address for backend {0}")]
    UnknownOwner(String),

    #[error("redirect transport error: {0}")]
    Transport(String),

    #[error("redirect rejected with status {0}")]
    Rejected(u16),
}

impl From<ChannelError> for DeliveryFailure {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Closed => DeliveryFailure::ChannelClosed,
            ChannelError::Cancelled => DeliveryFailure::Cancelled,
        }
    }
}

/// Build the redirect URL for a lease address (`host:port` or a base URL).
pub fn redirect_url(addr: &str) -> String {
    let base = addr.trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        format!("{}{}", base, REDIRECT_PATH)
    } else {
        format!("http://{}{}", base, REDIRECT_PATH)
    }
}

pub struct MessageRouter {
    registry: Arc<LocalChannelRegistry>,
    directory: SessionDirectory,
    leases: Arc<dyn KvStore>,
    identity: BackendIdentity,
    http: reqwest::Client,
    delivery_timeout: Duration,
}

impl MessageRouter {
    /// `leases` is the store holding backend identity leases; it is usually
    /// the same store that backs `directory`.
    pub fn new(
        registry: Arc<LocalChannelRegistry>,
        directory: SessionDirectory,
        leases: Arc<dyn KvStore>,
        identity: BackendIdentity,
        delivery_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            directory,
            leases,
            identity,
            http: reqwest::Client::new(),
            delivery_timeout,
        }
    }

    pub fn identity(&self) -> &BackendIdentity {
        &self.identity
    }

    /// Deliver `text` from `from` to `to`.
    pub async fn deliver(
        &self,
        cancel: &CancellationToken,
        from: UserId,
        to: UserId,
        text: &str,
    ) -> DeliveryOutcome {
        let outcome = self.route(cancel, from, to, text).await;
        match &outcome {
            DeliveryOutcome::Local => {
                tracing::debug!(from_user_id = from, to_user_id = to, "[Router] Delivered locally")
            }
            DeliveryOutcome::Redirected { owner } => tracing::debug!(
                from_user_id = from,
                to_user_id = to,
                owner = %owner,
                "[Router] Redirected to owning backend"
            ),
            DeliveryOutcome::Offline => {
                tracing::debug!(to_user_id = to, "[Router] Recipient offline, dropping")
            }
            DeliveryOutcome::StaleSelfEntry => tracing::warn!(
                to_user_id = to,
                "[Router] Directory points at this backend but no local channel exists, dropping"
            ),
            DeliveryOutcome::Failed(reason) => tracing::warn!(
                from_user_id = from,
                to_user_id = to,
                reason = %reason,
                "[Router] Delivery failed"
            ),
        }
        outcome
    }

    async fn route(
        &self,
        cancel: &CancellationToken,
        from: UserId,
        to: UserId,
        text: &str,
    ) -> DeliveryOutcome {
        if let Some(channel) = self.registry.get(to) {
            let push = OutboundPush::new(text, Some(from));
            return match tokio::time::timeout(self.delivery_timeout, channel.send(push, cancel)).await {
                Ok(Ok(())) => DeliveryOutcome::Local,
                Ok(Err(e)) => DeliveryOutcome::Failed(e.into()),
                Err(_) => DeliveryOutcome::Failed(DeliveryFailure::Timeout),
            };
        }

        let owner = match self.directory.lookup(to).await {
            Ok(Some(owner)) => owner,
            Ok(None) => return DeliveryOutcome::Offline,
            Err(e) => return DeliveryOutcome::Failed(DeliveryFailure::Directory(e.to_string())),
        };

        if owner == self.identity {
            return DeliveryOutcome::StaleSelfEntry;
        }

        let addr = match self.leases.get(owner.as_str()).await {
            Ok(Some(addr)) => addr,
            Ok(None) => {
                return DeliveryOutcome::Failed(DeliveryFailure::UnknownOwner(owner.to_string()))
            }
            Err(e) => return DeliveryOutcome::Failed(DeliveryFailure::Directory(e.to_string())),
        };

        let body = MessageRedirect::new(text, to, Some(from));
        match self.forward(cancel, &addr, &body).await {
            Ok(()) => DeliveryOutcome::Redirected { owner },
            Err(reason) => DeliveryOutcome::Failed(reason),
        }
    }

    async fn forward(
        &self,
        cancel: &CancellationToken,
        addr: &str,
        body: &MessageRedirect,
    ) -> Result<(), DeliveryFailure> {
        let request = self
            .http
            .post(redirect_url(addr))
            .timeout(self.delivery_timeout)
            .json(body)
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(DeliveryFailure::Cancelled),
            response = request => response,
        };

        match response {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => Err(DeliveryFailure::Rejected(response.status().as_u16())),
            Err(e) if e.is_timeout() => Err(DeliveryFailure::Timeout),
            Err(e) => Err(DeliveryFailure::Transport(e.to_string())),
        }
    }
}
