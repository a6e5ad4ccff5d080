//! Cache store contract.
//!
//! The store is a plain key-value service: string keys, serialized string
//! values, per-key expiry and an atomic counter. Each key is independently
//! consistent; there are no multi-key transactions.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by cache stores and the accessor built on top of them.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store could not be reached or rejected the command.
    #[error("cache store unavailable: {message}")]
    Unavailable { message: String },
    /// A value could not be encoded for storage.
    #[error("cached value could not be encoded: {0}")]
    Serialization(#[from] serde_json::Error),
    /// `increment` was called on a key that holds a non-integer value.
    #[error("cache key `{key}` does not hold a counter")]
    NotACounter { key: String },
}

impl CacheError {
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }
}

/// Key-value store used by the cache-aside accessor and invalidation hooks.
///
/// `put` and `delete` are last-writer-wins. `increment` creates the key with
/// value `1` when absent and never expires it.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the live value for `key`. Expired entries read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, replacing any previous value, expiring after `ttl`.
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Remove `key`. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Atomically add one to the integer stored at `key` and return the new value.
    async fn increment(&self, key: &str) -> Result<i64, CacheError>;
}
