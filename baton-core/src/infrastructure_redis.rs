//! Redis-backed CoordinationStore implementation.
//!
//! Enable with the `redis` feature flag. Acquisition is `SET NX PX` and a
//! plain refresh is `PEXPIRE`. Ownership-verified refresh runs as a Lua
//! script so the holder check and the `PEXPIRE` are atomic on the server.

use std::time::Duration;

use async_trait::async_trait;
use fred::clients::Pool;
use fred::interfaces::{ClientLike, KeysInterface, LuaInterface};
use fred::types::config::Config;
use fred::types::{Builder, Expiration, SetOptions};
use tracing::info;

use crate::error::StoreError;
use crate::infrastructure::CoordinationStore;

const REFRESH_IF_HOLDER_SCRIPT: &str = r#"
    if redis.call('GET', KEYS[1]) == ARGV[1] then
        return redis.call('PEXPIRE', KEYS[1], ARGV[2])
    end
    return 0
"#;

/// A coordination store backed by a Redis-compatible server.
pub struct RedisStore {
    pool: Pool,
}

fn backend(err: fred::error::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn ttl_ms(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}

impl RedisStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379`).
    ///
    /// Each candidate gets its own single-connection pool.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let config = Config::from_url(url).map_err(backend)?;
        let pool = Builder::from_config(config).build_pool(1).map_err(backend)?;
        pool.init().await.map_err(backend)?;
        info!(%url, "connected to redis coordination store");
        Ok(Self { pool })
    }
}

#[async_trait]
impl CoordinationStore for RedisStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let reply: Option<String> = self
            .pool
            .set(
                key,
                value,
                Some(Expiration::PX(ttl_ms(ttl))),
                Some(SetOptions::NX),
                false,
            )
            .await
            .map_err(backend)?;
        // SET … NX replies "OK" when the key was set, nil otherwise.
        Ok(reply.is_some())
    }

    async fn refresh_ttl(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let refreshed: bool = self
            .pool
            .pexpire(key, ttl_ms(ttl), None)
            .await
            .map_err(backend)?;
        Ok(refreshed)
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.pool.get::<Option<String>, _>(key).await.map_err(backend)
    }

    async fn refresh_if_holder(
        &self,
        key: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let refreshed: i64 = self
            .pool
            .eval(
                REFRESH_IF_HOLDER_SCRIPT,
                vec![key.to_string()],
                vec![holder.to_string(), ttl_ms(ttl).to_string()],
            )
            .await
            .map_err(backend)?;
        Ok(refreshed == 1)
    }
}
