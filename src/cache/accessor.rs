//! Cache-aside reads.

use std::{future::Future, sync::Arc, time::Duration};

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::keys::{Namespace, ScopedKey, template_of};
use super::store::{CacheError, CacheStore};

const SOURCE: &str = "nextconfig::cache::accessor";

pub(crate) const METRIC_HIT: &str = "nextconfig_cache_hit_total";
pub(crate) const METRIC_MISS: &str = "nextconfig_cache_miss_total";
pub(crate) const METRIC_BYPASS: &str = "nextconfig_cache_bypass_total";

/// Wraps a [`CacheStore`] with fetch-or-compute semantics.
///
/// Callers never observe cache failures: an unreachable store degrades to
/// computing every value directly, and an undecodable entry is recomputed and
/// overwritten. Concurrent misses on one key may each compute; the last `put`
/// wins.
#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn CacheStore>,
}

impl CacheAside {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Return the cached value for `key`, or run `compute`, cache its result
    /// for `ttl` and return it. Errors from `compute` propagate and nothing is
    /// cached.
    pub async fn fetch_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let template = template_of(key);

        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    counter!(METRIC_HIT, "template" => template.to_string()).increment(1);
                    return Ok(value);
                }
                Err(err) => {
                    warn!(
                        target = SOURCE,
                        key = key,
                        error = %err,
                        "discarding undecodable cache entry"
                    );
                }
            },
            Ok(None) => {}
            Err(err) => {
                counter!(METRIC_BYPASS, "template" => template.to_string()).increment(1);
                warn!(
                    target = SOURCE,
                    key = key,
                    error = %err,
                    "cache store unavailable, computing directly"
                );
                return compute().await;
            }
        }

        counter!(METRIC_MISS, "template" => template.to_string()).increment(1);
        let value = compute().await?;
        self.store_value(key, &value, ttl).await;
        Ok(value)
    }

    /// Like [`fetch_or_compute`](Self::fetch_or_compute) for a key inside a
    /// generation namespace. If the generation cannot be read the value is
    /// computed and not cached.
    pub async fn fetch_scoped<T, E, F, Fut>(
        &self,
        key: &ScopedKey,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.generation(key.namespace()).await {
            Ok(generation) => {
                self.fetch_or_compute(&key.render(generation), ttl, compute)
                    .await
            }
            Err(err) => {
                counter!(METRIC_BYPASS, "template" => key.template()).increment(1);
                warn!(
                    target = SOURCE,
                    namespace = %key.namespace(),
                    error = %err,
                    "namespace generation unreadable, computing directly"
                );
                compute().await
            }
        }
    }

    /// Current generation of `namespace`; an absent counter is generation 0.
    pub async fn generation(&self, namespace: Namespace) -> Result<i64, CacheError> {
        let counter_key = namespace.counter_key();
        match self.store.get(&counter_key).await? {
            None => Ok(0),
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| CacheError::NotACounter { key: counter_key }),
        }
    }

    async fn store_value<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(
                    target = SOURCE,
                    key = key,
                    error = %CacheError::from(err),
                    "skipping cache write"
                );
                return;
            }
        };

        match self.store.put(key, encoded, ttl).await {
            Ok(()) => debug!(
                target = SOURCE,
                key = key,
                ttl_secs = ttl.as_secs(),
                "cached computed value"
            ),
            Err(err) => warn!(
                target = SOURCE,
                key = key,
                error = %err,
                "failed to cache computed value"
            ),
        }
    }
}
