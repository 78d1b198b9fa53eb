// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! [`KeyValueClient`] over a `redis` connection manager.

use std::time::Duration;

use cacheplex_provider::{BoxError, Error, Result};
use redis::aio::ConnectionManager;

use crate::KeyValueClient;

/// A Redis client using `redis::aio::ConnectionManager` for multiplexed connections with
/// automatic reconnection.
#[derive(Clone)]
pub struct RedisClient {
    manager: ConnectionManager,
    endpoint: String,
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl RedisClient {
    /// Connects to the server at `url`.
    ///
    /// The endpoint reported by the client is `url` without credentials.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the URL is malformed or the server cannot be reached.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| Error::backend("opening redis client", e))?;
        let endpoint = client.get_connection_info().addr.to_string();
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::backend(format!("connecting to '{endpoint}'"), e))?;

        tracing::debug!(cache.endpoint = %endpoint, "redis client connected");

        Ok(Self { manager, endpoint })
    }

    async fn query<T: redis::FromRedisValue>(&self, cmd: &redis::Cmd) -> std::result::Result<T, BoxError> {
        let mut conn = self.manager.clone();
        Ok(cmd.query_async(&mut conn).await?)
    }
}

fn millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

impl KeyValueClient for RedisClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get(&self, key: &str) -> std::result::Result<Option<String>, BoxError> {
        self.query(redis::cmd("GET").arg(key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> std::result::Result<(), BoxError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(millis(ttl));
        }
        self.query(&cmd).await
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> std::result::Result<bool, BoxError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX");
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(millis(ttl));
        }
        let reply: Option<String> = self.query(&cmd).await?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> std::result::Result<bool, BoxError> {
        let deleted: i64 = self.query(redis::cmd("DEL").arg(key)).await?;
        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> std::result::Result<bool, BoxError> {
        let count: i64 = self.query(redis::cmd("EXISTS").arg(key)).await?;
        Ok(count > 0)
    }

    async fn incr_by(&self, key: &str, delta: i64) -> std::result::Result<i64, BoxError> {
        self.query(redis::cmd("INCRBY").arg(key).arg(delta)).await
    }

    async fn expire(&self, key: &str, ttl: Option<Duration>) -> std::result::Result<bool, BoxError> {
        match ttl {
            Some(ttl) => {
                let applied: i64 = self.query(redis::cmd("PEXPIRE").arg(key).arg(millis(ttl))).await?;
                Ok(applied == 1)
            }
            None => {
                // PERSIST reports 0 both for a missing key and a key without expiration.
                let _: i64 = self.query(redis::cmd("PERSIST").arg(key)).await?;
                self.exists(key).await
            }
        }
    }

    async fn ttl(&self, key: &str) -> std::result::Result<Option<Duration>, BoxError> {
        let millis: i64 = self.query(redis::cmd("PTTL").arg(key)).await?;
        Ok(u64::try_from(millis).ok().map(Duration::from_millis))
    }

    async fn lpush(&self, key: &str, value: &str) -> std::result::Result<u64, BoxError> {
        self.query(redis::cmd("LPUSH").arg(key).arg(value)).await
    }

    async fn rpush(&self, key: &str, value: &str) -> std::result::Result<u64, BoxError> {
        self.query(redis::cmd("RPUSH").arg(key).arg(value)).await
    }

    async fn lpop(&self, key: &str) -> std::result::Result<Option<String>, BoxError> {
        self.query(redis::cmd("LPOP").arg(key)).await
    }

    async fn rpop(&self, key: &str) -> std::result::Result<Option<String>, BoxError> {
        self.query(redis::cmd("RPOP").arg(key)).await
    }

    async fn llen(&self, key: &str) -> std::result::Result<u64, BoxError> {
        self.query(redis::cmd("LLEN").arg(key)).await
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> std::result::Result<bool, BoxError> {
        let added: i64 = self.query(redis::cmd("HSET").arg(key).arg(field).arg(value)).await?;
        Ok(added > 0)
    }

    async fn hget(&self, key: &str, field: &str) -> std::result::Result<Option<String>, BoxError> {
        self.query(redis::cmd("HGET").arg(key).arg(field)).await
    }

    async fn hdel(&self, key: &str, field: &str) -> std::result::Result<bool, BoxError> {
        let deleted: i64 = self.query(redis::cmd("HDEL").arg(key).arg(field)).await?;
        Ok(deleted > 0)
    }

    async fn hexists(&self, key: &str, field: &str) -> std::result::Result<bool, BoxError> {
        self.query(redis::cmd("HEXISTS").arg(key).arg(field)).await
    }

    async fn hlen(&self, key: &str) -> std::result::Result<u64, BoxError> {
        self.query(redis::cmd("HLEN").arg(key)).await
    }
}
