//! Store wrappers that misbehave on demand.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chatrelay::backend::store::{Extension, KvStore, MemoryStore, StoreError};

/// Delegates to a `MemoryStore`, except that while stalled every write to a
/// session directory key never completes.
#[derive(Clone)]
pub struct StallingStore {
    inner: MemoryStore,
    stalled: Arc<AtomicBool>,
}

impl StallingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            stalled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stall_directory_writes(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }
}

#[async_trait]
impl KvStore for StallingStore {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        if self.stalled.load(Ordering::SeqCst) && key.starts_with("session_user_") {
            std::future::pending::<()>().await;
        }
        self.inner.set_with_ttl(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.delete(key).await
    }

    async fn claim(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.inner.claim(key, value, ttl).await
    }

    async fn extend(&self, key: &str, value: &str, ttl: Duration) -> Result<Extension, StoreError> {
        self.inner.extend(key, value, ttl).await
    }

    async fn delete_if(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        self.inner.delete_if(key, value).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}
