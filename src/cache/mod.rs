//! NextConfig query cache
//!
//! A read-through cache in front of the database:
//!
//! - **Accessor**: [`CacheAside`] returns a cached value or computes, stores and
//!   returns it. Store outages degrade to direct computation.
//! - **Invalidation**: every committed write runs the [`Invalidator`] with a
//!   [`Change`] describing it. Keys whose parameters cannot be enumerated live
//!   in a generation [`Namespace`] and are retired by bumping its counter.
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `nextconfig.toml`:
//!
//! ```toml
//! [cache]
//! backend = "redis"
//! redis_url = "redis://127.0.0.1:6379/0"
//! key_prefix = "nextconfig"
//! volatile_ttl_seconds = 300
//! editorial_ttl_seconds = 3600
//! static_ttl_seconds = 86400
//! ```

mod accessor;
mod config;
mod invalidation;
pub mod keys;
mod memory;
mod redis;
mod store;

use std::sync::Arc;

use tracing::info;

pub use accessor::CacheAside;
pub use config::{CacheConfig, TtlClass, TtlPolicy};
pub use invalidation::{
    Action, Change, InvalidationFailure, InvalidationReport, Invalidator,
};
pub use keys::{Namespace, ScopedKey};
pub use memory::MemoryStore;
pub use redis::RedisStore;
pub use store::{CacheError, CacheStore};

pub(crate) use accessor::{METRIC_BYPASS, METRIC_HIT, METRIC_MISS};
pub(crate) use invalidation::{METRIC_GENERATION_BUMP, METRIC_INVALIDATION_FAILURE};

use crate::config::CacheBackend;

/// Build the store selected by `config`.
pub async fn connect_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, CacheError> {
    match config.backend {
        CacheBackend::Memory => {
            info!(
                target = "nextconfig::cache",
                "using in-process cache store"
            );
            Ok(Arc::new(MemoryStore::new()))
        }
        CacheBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| CacheError::unavailable("redis backend selected without a url"))?;
            let store = RedisStore::connect(url, config.key_prefix.clone()).await?;
            Ok(Arc::new(store))
        }
    }
}
