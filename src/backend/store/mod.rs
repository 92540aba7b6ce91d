//! Shared Key/Value Store
//!
//! The session directory and the backend identity lease both live in an
//! external key/value store with per-key expiry. This module defines the
//! contract they rely on and two implementations:
//!
//! - **`redis`** - production store shared by every backend process
//! - **`memory`** - in-process store for single-node runs and tests
//!
//! # Module Structure
//!
//! ```text
//! store/
//! ├── mod.rs     - KvStore trait and StoreError
//! ├── redis.rs   - Redis implementation
//! └── memory.rs  - In-memory implementation with expiry
//! ```
//!
//! Every operation touches a single key. No operation spans the directory and
//! the local channel registry.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Redis-backed store
pub mod redis;

/// In-memory store
pub mod memory;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Errors raised by a key/value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result of a value-checked expiry extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Extended,
    /// Key absent or expired
    Missing,
    /// Key present with a different value
    HeldByOther,
}

/// Key/value store with per-key expiry.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Unconditionally set `key` to `value`, expiring after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Read a live key; `Ok(None)` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Unconditionally delete `key`. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Set `key` only if it does not currently exist, under a watch so a
    /// concurrent writer aborts the claim. Returns `Ok(false)` on conflict.
    async fn claim(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Reset the expiry of `key` to `ttl` from now, but only while it still
    /// holds `value`.
    async fn extend(&self, key: &str, value: &str, ttl: Duration) -> Result<Extension, StoreError>;

    /// Delete `key` only while it still holds `value`. Returns whether a key
    /// was removed.
    async fn delete_if(&self, key: &str, value: &str) -> Result<bool, StoreError>;

    /// Round-trip check used at start-up.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Expiry in whole milliseconds, never zero (a zero PX is rejected by redis).
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_millis_never_zero() {
        assert_eq!(ttl_millis(Duration::ZERO), 1);
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
        assert_eq!(ttl_millis(Duration::from_secs(2)), 2000);
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::Unavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "store unavailable: connection refused");
    }
}
