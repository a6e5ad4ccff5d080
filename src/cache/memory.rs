//! In-process cache store.
//!
//! Backs single-node deployments and tests. Expiry uses `tokio::time::Instant`
//! so paused-clock tests can step past a TTL without sleeping.
//!
//! Keys orphaned by a generation bump are never read again, so expired entries
//! are also swept from `put`, at most once per sweep interval.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use tokio::time::Instant;

use super::store::{CacheError, CacheStore};

#[derive(Debug, Clone)]
struct StoredEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Concurrent in-memory implementation of [`CacheStore`].
#[derive(Debug)]
pub struct MemoryStore {
    entries: DashMap<String, StoredEntry>,
    origin: Instant,
    sweep_interval: Duration,
    /// Milliseconds after `origin` at which the next sweep is due.
    next_sweep_ms: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweep_interval(sweep_interval: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            origin: Instant::now(),
            sweep_interval,
            next_sweep_ms: AtomicU64::new(millis(sweep_interval)),
        }
    }

    /// Number of physically present entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry. Counters carry no expiry and are kept.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    fn sweep_if_due(&self, now: Instant) {
        let elapsed = millis(now.duration_since(self.origin));
        let due = self.next_sweep_ms.load(Ordering::Relaxed);
        if elapsed < due {
            return;
        }
        let next = elapsed.saturating_add(millis(self.sweep_interval));
        // Only the caller that moves the deadline forward sweeps.
        if self
            .next_sweep_ms
            .compare_exchange(due, next, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            self.purge_expired();
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            // A concurrent put may have replaced the entry in the meantime.
            self.entries
                .remove_if(key, |_, entry| !entry.is_live(Instant::now()));
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        self.sweep_if_due(now);
        let expires_at = now + ttl;
        self.entries.insert(
            key.to_string(),
            StoredEntry {
                value,
                expires_at: Some(expires_at),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64, CacheError> {
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                let current = if entry.is_live(now) {
                    entry
                        .value
                        .parse::<i64>()
                        .map_err(|_| CacheError::NotACounter {
                            key: key.to_string(),
                        })?
                } else {
                    0
                };
                let next = current.saturating_add(1);
                entry.value = next.to_string();
                if !entry.is_live(now) {
                    entry.expires_at = None;
                }
                Ok(next)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoredEntry {
                    value: "1".to_string(),
                    expires_at: None,
                });
                Ok(1)
            }
        }
    }
}
