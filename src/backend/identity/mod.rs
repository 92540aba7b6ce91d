/**
 * Backend Identity Manager
 *
 * Every backend process owns a unique, opaque identity for its whole lifetime.
 * The identity is written as the owner of each session directory entry the
 * process announces, and it is held in the shared store as a lease whose value
 * is the process's advertised `host:port`, so peers can turn a directory entry
 * into a network address.
 *
 * # Acquisition
 *
 * A candidate token (`backend-` followed by 10 random alphanumeric characters)
 * is claimed with `KvStore::claim`. A conflict means another process holds the
 * token; a fresh candidate is drawn and the claim retried. Conflicts are never
 * errors. After `max_attempts` failed candidates start-up is abandoned.
 *
 * # Renewal
 *
 * Once acquired, a background task wakes every two thirds of the lease TTL and
 * resets the expiry to the full TTL, provided the lease still carries this
 * process's address. If the key has vanished (store restart, long pause) the
 * same token is claimed again. Renewal failures are logged and retried on the
 * next tick.
 */

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::backend::store::{Extension, KvStore, StoreError};

/// Prefix of every backend identity token.
pub const IDENTITY_PREFIX: &str = "backend-";

/// Number of random characters after the prefix.
pub const IDENTITY_SUFFIX_LEN: usize = 10;

/// Errors raised while acquiring the identity lease.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no free backend identity after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("identity store error: {0}")]
    Store(#[from] StoreError),
}

/// Opaque identity of one backend process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackendIdentity(String);

impl BackendIdentity {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BackendIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Draw a random identity candidate.
pub fn random_candidate() -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(IDENTITY_SUFFIX_LEN)
        .collect();
    format!("{}{}", IDENTITY_PREFIX, suffix)
}

/// What a single renewal pass found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalOutcome {
    /// Expiry reset to the full TTL
    Extended,
    /// Key was missing and has been claimed again
    Reclaimed,
    /// Key was missing and another process now holds the token
    Lost,
}

/// Holder of this process's identity lease.
pub struct IdentityManager {
    identity: BackendIdentity,
    advertise_addr: String,
    ttl: Duration,
    store: Arc<dyn KvStore>,
    cancel: CancellationToken,
    renewal: Mutex<Option<JoinHandle<()>>>,
}

impl IdentityManager {
    /// Acquire a unique identity using random candidates.
    pub async fn acquire(
        store: Arc<dyn KvStore>,
        advertise_addr: impl Into<String>,
        ttl: Duration,
        max_attempts: u32,
    ) -> Result<Self, IdentityError> {
        Self::acquire_with(store, advertise_addr, ttl, max_attempts, random_candidate).await
    }

    /// Acquire a unique identity drawing candidates from `next_candidate`.
    ///
    /// Store errors abort acquisition; conflicts consume one attempt each.
    pub async fn acquire_with<G>(
        store: Arc<dyn KvStore>,
        advertise_addr: impl Into<String>,
        ttl: Duration,
        max_attempts: u32,
        mut next_candidate: G,
    ) -> Result<Self, IdentityError>
    where
        G: FnMut() -> String + Send,
    {
        let advertise_addr = advertise_addr.into();

        for attempt in 1..=max_attempts {
            let candidate = next_candidate();
            if store.claim(&candidate, &advertise_addr, ttl).await? {
                tracing::info!(
                    backend_id = %candidate,
                    attempt,
                    "[Identity] Acquired backend identity for {}",
                    advertise_addr
                );
                return Ok(Self {
                    identity: BackendIdentity::new(candidate),
                    advertise_addr,
                    ttl,
                    store,
                    cancel: CancellationToken::new(),
                    renewal: Mutex::new(None),
                });
            }
            tracing::debug!(candidate = %candidate, attempt, "[Identity] Candidate taken, retrying");
        }

        Err(IdentityError::Exhausted {
            attempts: max_attempts,
        })
    }

    pub fn identity(&self) -> &BackendIdentity {
        &self.identity
    }

    pub fn advertise_addr(&self) -> &str {
        &self.advertise_addr
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Interval between renewals: two thirds of the TTL.
    pub fn renewal_period(&self) -> Duration {
        (self.ttl * 2 / 3).max(Duration::from_millis(1))
    }

    /// Extend the lease once, reclaiming the same token if the key is gone.
    ///
    /// The lease is only extended while it still carries this process's
    /// address; a token taken over by another process is reported as lost.
    pub async fn renew(&self) -> Result<RenewalOutcome, StoreError> {
        let key = self.identity.as_str();
        match self.store.extend(key, &self.advertise_addr, self.ttl).await? {
            Extension::Extended => return Ok(RenewalOutcome::Extended),
            Extension::HeldByOther => {
                self.report_lost();
                return Ok(RenewalOutcome::Lost);
            }
            Extension::Missing => {}
        }

        if self.store.claim(key, &self.advertise_addr, self.ttl).await? {
            tracing::warn!(backend_id = %self.identity, "[Identity] Lease had expired; reclaimed");
            Ok(RenewalOutcome::Reclaimed)
        } else {
            self.report_lost();
            Ok(RenewalOutcome::Lost)
        }
    }

    fn report_lost(&self) {
        tracing::error!(
            backend_id = %self.identity,
            "[Identity] Lease expired and the token is now held by another process"
        );
    }

    /// Start the background renewal task. Calling it twice is a no-op.
    pub fn start_renewal(self: &Arc<Self>) {
        let mut slot = self.renewal.lock();
        if slot.is_some() {
            return;
        }

        let manager = Arc::clone(self);
        let period = self.renewal_period();
        let cancel = self.cancel.clone();

        *slot = Some(tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = manager.renew().await {
                            tracing::warn!(
                                backend_id = %manager.identity,
                                error = %e,
                                "[Identity] Lease renewal failed"
                            );
                        }
                    }
                }
            }
            tracing::debug!(backend_id = %manager.identity, "[Identity] Renewal stopped");
        }));
    }

    /// Stop renewal and release the lease.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.renewal.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        match self
            .store
            .delete_if(self.identity.as_str(), &self.advertise_addr)
            .await
        {
            Ok(true) => tracing::info!(backend_id = %self.identity, "[Identity] Lease released"),
            Ok(false) => tracing::warn!(
                backend_id = %self.identity,
                "[Identity] Lease no longer ours at shutdown; left in place"
            ),
            Err(e) => tracing::warn!(
                backend_id = %self.identity,
                error = %e,
                "[Identity] Failed to release lease"
            ),
        }
    }
}

impl std::fmt::Debug for IdentityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityManager")
            .field("identity", &self.identity)
            .field("advertise_addr", &self.advertise_addr)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl Drop for IdentityManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
