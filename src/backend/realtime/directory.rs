//! Distributed Session Directory
//!
//! Cluster-wide map from a user to the identity of the backend currently
//! holding that user's connection, stored under `session_user_{id}` with an
//! expiry. Announcements are unconditional: the last announcing backend
//! wins, and a stale entry is corrected only by expiry or by its true owner
//! announcing again. A session ending removes the entry only if it still names
//! this backend.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::identity::BackendIdentity;
use crate::backend::store::{KvStore, StoreError};
use crate::shared::UserId;

/// Store key of a user's directory entry.
pub fn session_key(user: UserId) -> String {
    format!("session_user_{}", user)
}

#[derive(Clone)]
pub struct SessionDirectory {
    store: Arc<dyn KvStore>,
}

impl SessionDirectory {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Record `identity` as the owner of `user`'s connection for `ttl`.
    pub async fn announce(
        &self,
        user: UserId,
        identity: &BackendIdentity,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.store
            .set_with_ttl(&session_key(user), identity.as_str(), ttl)
            .await
    }

    pub async fn forget(&self, user: UserId) -> Result<(), StoreError> {
        self.store.delete(&session_key(user)).await
    }

    /// Remove `user`'s entry only while it still names `identity`, so an
    /// entry already re-announced by another backend survives. Returns
    /// whether an entry was removed.
    pub async fn forget_owned(
        &self,
        user: UserId,
        identity: &BackendIdentity,
    ) -> Result<bool, StoreError> {
        self.store
            .delete_if(&session_key(user), identity.as_str())
            .await
    }

    /// Owner of `user`'s connection, separating "absent" from store failure.
    pub async fn lookup(&self, user: UserId) -> Result<Option<BackendIdentity>, StoreError> {
        Ok(self
            .store
            .get(&session_key(user))
            .await?
            .map(BackendIdentity::new))
    }

    /// Owner of `user`'s connection; store failures are logged and read as absent.
    pub async fn resolve(&self, user: UserId) -> Option<BackendIdentity> {
        match self.lookup(user).await {
            Ok(owner) => owner,
            Err(e) => {
                tracing::warn!(user_id = user, error = %e, "[Directory] Lookup failed");
                None
            }
        }
    }
}
