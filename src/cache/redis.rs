//! Redis-backed cache store shared by every process of a deployment.

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, ErrorKind, RedisError, aio::ConnectionManager};
use tracing::info;

use super::store::{CacheError, CacheStore};

const SOURCE: &str = "nextconfig::cache::redis";

/// [`CacheStore`] over a multiplexed, auto-reconnecting Redis connection.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    /// Connect to `url`; every key is namespaced as `{prefix}:{key}`.
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(CacheError::unavailable)?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(CacheError::unavailable)?;
        let prefix = prefix.into();

        info!(target = SOURCE, prefix = %prefix, "connected to redis cache");

        Ok(Self { connection, prefix })
    }

    fn namespaced(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{key}", self.prefix)
        }
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection.clone();
        conn.get(self.namespaced(key))
            .await
            .map_err(CacheError::unavailable)
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        // SET EX rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(self.namespaced(key), value, seconds)
            .await
            .map_err(CacheError::unavailable)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        conn.del::<_, i64>(self.namespaced(key))
            .await
            .map(|_| ())
            .map_err(CacheError::unavailable)
    }

    async fn increment(&self, key: &str) -> Result<i64, CacheError> {
        let mut conn = self.connection.clone();
        let namespaced = self.namespaced(key);
        conn.incr::<_, _, i64>(&namespaced, 1_i64)
            .await
            .map_err(|err| increment_error(key, err))
    }
}

/// INCR on a non-integer value answers with a plain `ERR` reply.
fn increment_error(key: &str, err: RedisError) -> CacheError {
    if err.kind() == ErrorKind::ResponseError && err.code() == Some("ERR") {
        CacheError::NotACounter {
            key: key.to_string(),
        }
    } else {
        CacheError::unavailable(err)
    }
}
