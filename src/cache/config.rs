//! Cache configuration.
//!
//! TTLs are assigned per class of data, by how often it is written:
//! visitor-submitted content churns in minutes, editorial content changes a
//! few times a day, revenue figures at most once a day.

use std::time::Duration;

use crate::config::{CacheBackend, CacheSettings};
use crate::infra::error::InfraError;

const DEFAULT_VOLATILE_TTL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_EDITORIAL_TTL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_STATIC_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Write-frequency class of a cached query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlClass {
    /// Comments and reviews, written by visitors and moderated continuously.
    Volatile,
    /// Posts, tags, FAQs and projects, written from the back office.
    Editorial,
    /// Revenue figures and the list of revenue years.
    Static,
}

/// TTL per [`TtlClass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub volatile: Duration,
    pub editorial: Duration,
    pub static_data: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            volatile: DEFAULT_VOLATILE_TTL,
            editorial: DEFAULT_EDITORIAL_TTL,
            static_data: DEFAULT_STATIC_TTL,
        }
    }
}

impl TtlPolicy {
    pub fn ttl(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::Volatile => self.volatile,
            TtlClass::Editorial => self.editorial,
            TtlClass::Static => self.static_data,
        }
    }
}

/// Cache configuration from `nextconfig.toml`.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Store implementation to connect.
    pub backend: CacheBackend,
    /// Connection URL when `backend` is Redis.
    pub redis_url: Option<String>,
    /// Prefix applied to every key in shared stores.
    pub key_prefix: String,
    /// TTL per write-frequency class.
    pub ttl: TtlPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: None,
            key_prefix: "nextconfig".to_string(),
            ttl: TtlPolicy::default(),
        }
    }
}

impl CacheConfig {
    /// Fails unless the backend is reachable from outside the server process,
    /// which an out-of-band flush needs.
    pub fn ensure_shared(&self) -> Result<(), InfraError> {
        match self.backend {
            CacheBackend::Redis => Ok(()),
            CacheBackend::Memory => Err(InfraError::configuration(
                "the memory cache lives inside each server process; \
                 flush it with `POST /cache/flush` on the admin listener",
            )),
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            backend: settings.backend,
            redis_url: settings.redis_url.clone(),
            key_prefix: settings.key_prefix.clone(),
            ttl: TtlPolicy {
                volatile: settings.volatile_ttl,
                editorial: settings.editorial_ttl,
                static_data: settings.static_ttl,
            },
        }
    }
}
