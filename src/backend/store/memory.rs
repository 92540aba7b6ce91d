//! In-memory key/value store.
//!
//! Used when no redis address is configured (single-node mode) and by tests.
//! Expiry is measured on the tokio clock, so tests running with a paused
//! clock can advance time past a TTL deterministically.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::{Extension, KvStore, StoreError};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Process-local store with per-key expiry.
///
/// Clones share the same underlying map, which lets tests model several
/// backend processes talking to one store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every operation fails until brought back online.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Remaining lifetime of a live key.
    pub fn time_to_live(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .lock()
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.expires_at - now)
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    /// Look up a live entry, purging it when expired.
    fn live<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
        let expired = entries
            .get(key)
            .is_some_and(|entry| entry.expires_at <= Instant::now());
        if expired {
            entries.remove(key);
        }
        entries.get_mut(key)
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.check_online()?;
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock();
        Ok(Self::live(&mut entries, key).map(|entry| entry.value.clone()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_online()?;
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn claim(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.check_online()?;
        // The map lock stands in for WATCH/MULTI/EXEC: check and set are atomic.
        let mut entries = self.entries.lock();
        if Self::live(&mut entries, key).is_some() {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(true)
    }

    async fn extend(&self, key: &str, value: &str, ttl: Duration) -> Result<Extension, StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock();
        match Self::live(&mut entries, key) {
            Some(entry) if entry.value == value => {
                entry.expires_at = Instant::now() + ttl;
                Ok(Extension::Extended)
            }
            Some(_) => Ok(Extension::HeldByOther),
            None => Ok(Extension::Missing),
        }
    }

    async fn delete_if(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock();
        let matches = Self::live(&mut entries, key).is_some_and(|entry| entry.value == value);
        if matches {
            entries.remove(key);
        }
        Ok(matches)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }
}
