// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Remote key-value provider.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use cacheplex_provider::{BoxError, CacheProvider, CacheValue, Error, Expiration, Result, codec, validate};
use tick::Clock;

use crate::KeyValueClient;

/// A cache provider that stores JSON text in a remote key-value store.
///
/// Keys are optionally namespaced with a prefix so several caches can share one server.
/// Engine failures are wrapped into backend errors describing the failed action, with the
/// engine's error kept as the source.
#[derive(Debug)]
pub struct RedisCacheProvider<C> {
    client: Arc<C>,
    key_prefix: Option<Arc<str>>,
    clock: Clock,
}

impl<C> Clone for RedisCacheProvider<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            key_prefix: self.key_prefix.clone(),
            clock: self.clock.clone(),
        }
    }
}

fn backend(action: impl Display, error: BoxError) -> Error {
    tracing::debug!(cache.action = %action, error = %error, "key-value call failed");
    Error::backend(action.to_string(), error)
}

impl<C: KeyValueClient> RedisCacheProvider<C> {
    /// Creates a provider over `client`.
    ///
    /// The clock resolves absolute expirations.
    #[must_use]
    pub fn new(client: Arc<C>, clock: Clock) -> Self {
        Self {
            client,
            key_prefix: None,
            clock,
        }
    }

    /// Prefixes every key with `prefix`.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.key_prefix = (!prefix.is_empty()).then(|| Arc::from(prefix));
        self
    }

    /// Returns the key prefix, if any.
    #[must_use]
    pub fn key_prefix(&self) -> Option<&str> {
        self.key_prefix.as_deref()
    }

    /// Returns the underlying client.
    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    fn full_key(&self, key: &str) -> Result<String> {
        validate::key(key)?;
        Ok(match &self.key_prefix {
            Some(prefix) => format!("{prefix}{key}"),
            None => key.to_string(),
        })
    }

    fn ttl(&self, expiration: Expiration) -> Result<Option<Duration>> {
        expiration.normalize(self.clock.system_time())
    }

    /// Stores `value` only when `key` holds nothing. Returns whether the value was stored.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey`, `InvalidValue`, or a backend error.
    pub async fn set_if_absent<T: CacheValue>(&self, key: &str, value: &T, expiration: Expiration) -> Result<bool> {
        let full_key = self.full_key(key)?;
        let text = codec::encode(value)?;
        let ttl = self.ttl(expiration)?;

        self.client
            .set_if_absent(&full_key, &text, ttl)
            .await
            .map_err(|e| backend(format_args!("adding value for key '{key}'"), e))
    }

    /// Atomically adds `delta` to the counter under `key`; a missing counter starts at zero.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey`, or a backend error when the key holds a non-integer value.
    pub async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        let full_key = self.full_key(key)?;

        self.client
            .incr_by(&full_key, delta)
            .await
            .map_err(|e| backend(format_args!("incrementing value for key '{key}'"), e))
    }

    /// Atomically subtracts `delta` from the counter under `key`; a missing counter starts at zero.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey`, `InvalidValue` when `delta` cannot be negated, or a backend error.
    pub async fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        let negated = delta.checked_neg().ok_or_else(|| Error::invalid_value("delta"))?;
        self.increment(key, negated).await
    }

    /// Replaces the expiration of an existing key; [`Expiration::never`] makes it persistent.
    ///
    /// Returns `false` when the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey`, `InvalidValue` for a past expiration, or a backend error.
    pub async fn expire(&self, key: &str, expiration: Expiration) -> Result<bool> {
        let full_key = self.full_key(key)?;
        let ttl = self.ttl(expiration)?;

        self.client
            .expire(&full_key, ttl)
            .await
            .map_err(|e| backend(format_args!("setting expiration for key '{key}'"), e))
    }

    /// Returns the remaining time-to-live of `key`.
    ///
    /// Returns `None` when the key does not exist or never expires.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` or a backend error.
    pub async fn time_to_live(&self, key: &str) -> Result<Option<Duration>> {
        let full_key = self.full_key(key)?;

        self.client
            .ttl(&full_key)
            .await
            .map_err(|e| backend(format_args!("reading expiration for key '{key}'"), e))
    }

    /// Prepends `value` to the list under `key`. Returns the list's length afterwards.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey`, `InvalidValue` for a null value, or a backend error when `key`
    /// holds something other than a list.
    pub async fn list_left_push<T: CacheValue>(&self, key: &str, value: &T) -> Result<u64> {
        let full_key = self.full_key(key)?;
        let text = codec::encode(value)?;

        self.client
            .lpush(&full_key, &text)
            .await
            .map_err(|e| backend(format_args!("pushing value to list '{key}'"), e))
    }

    /// Appends `value` to the list under `key`. Returns the list's length afterwards.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey`, `InvalidValue` for a null value, or a backend error when `key`
    /// holds something other than a list.
    pub async fn list_right_push<T: CacheValue>(&self, key: &str, value: &T) -> Result<u64> {
        let full_key = self.full_key(key)?;
        let text = codec::encode(value)?;

        self.client
            .rpush(&full_key, &text)
            .await
            .map_err(|e| backend(format_args!("pushing value to list '{key}'"), e))
    }

    /// Removes and returns the first element of the list under `key`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey`, or a backend error when the element is not a `T`.
    pub async fn list_left_pop<T: CacheValue>(&self, key: &str) -> Result<Option<T>> {
        let full_key = self.full_key(key)?;

        let text = self
            .client
            .lpop(&full_key)
            .await
            .map_err(|e| backend(format_args!("popping value from list '{key}'"), e))?;

        text.map(|text| codec::decode(key, &text)).transpose()
    }

    /// Removes and returns the last element of the list under `key`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey`, or a backend error when the element is not a `T`.
    pub async fn list_right_pop<T: CacheValue>(&self, key: &str) -> Result<Option<T>> {
        let full_key = self.full_key(key)?;

        let text = self
            .client
            .rpop(&full_key)
            .await
            .map_err(|e| backend(format_args!("popping value from list '{key}'"), e))?;

        text.map(|text| codec::decode(key, &text)).transpose()
    }

    /// Returns the number of elements in the list under `key`; zero when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` or a backend error.
    pub async fn list_length(&self, key: &str) -> Result<u64> {
        let full_key = self.full_key(key)?;

        self.client
            .llen(&full_key)
            .await
            .map_err(|e| backend(format_args!("reading length of list '{key}'"), e))
    }

    /// Stores `value` in `field` of the hash under `key`. Returns `true` when the field is new.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for a blank key or field, `InvalidValue` for a null value, or a
    /// backend error when `key` holds something other than a hash.
    pub async fn hash_set<T: CacheValue>(&self, key: &str, field: &str, value: &T) -> Result<bool> {
        let full_key = self.full_key(key)?;
        validate::identifier("field", field)?;
        let text = codec::encode(value)?;

        self.client
            .hset(&full_key, field, &text)
            .await
            .map_err(|e| backend(format_args!("setting field '{field}' of hash '{key}'"), e))
    }

    /// Reads `field` of the hash under `key`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for a blank key or field, or a backend error.
    pub async fn hash_get<T: CacheValue>(&self, key: &str, field: &str) -> Result<Option<T>> {
        let full_key = self.full_key(key)?;
        validate::identifier("field", field)?;

        let text = self
            .client
            .hget(&full_key, field)
            .await
            .map_err(|e| backend(format_args!("getting field '{field}' of hash '{key}'"), e))?;

        text.map(|text| codec::decode(key, &text)).transpose()
    }

    /// Deletes `field` of the hash under `key`. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for a blank key or field, or a backend error.
    pub async fn hash_delete(&self, key: &str, field: &str) -> Result<bool> {
        let full_key = self.full_key(key)?;
        validate::identifier("field", field)?;

        self.client
            .hdel(&full_key, field)
            .await
            .map_err(|e| backend(format_args!("removing field '{field}' of hash '{key}'"), e))
    }

    /// Returns whether the hash under `key` has `field`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for a blank key or field, or a backend error.
    pub async fn hash_exists(&self, key: &str, field: &str) -> Result<bool> {
        let full_key = self.full_key(key)?;
        validate::identifier("field", field)?;

        self.client
            .hexists(&full_key, field)
            .await
            .map_err(|e| backend(format_args!("checking field '{field}' of hash '{key}'"), e))
    }

    /// Returns the number of fields in the hash under `key`; zero when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` or a backend error.
    pub async fn hash_length(&self, key: &str) -> Result<u64> {
        let full_key = self.full_key(key)?;

        self.client
            .hlen(&full_key)
            .await
            .map_err(|e| backend(format_args!("reading length of hash '{key}'"), e))
    }
}

impl<C: KeyValueClient> CacheProvider for RedisCacheProvider<C> {
    async fn get<T: CacheValue>(&self, key: &str) -> Result<Option<T>> {
        let full_key = self.full_key(key)?;

        let text = self
            .client
            .get(&full_key)
            .await
            .map_err(|e| backend(format_args!("getting value for key '{key}'"), e))?;

        text.map(|text| codec::decode(key, &text)).transpose()
    }

    async fn set<T: CacheValue>(&self, key: &str, value: &T, expiration: Expiration) -> Result<()> {
        let full_key = self.full_key(key)?;
        let text = codec::encode(value)?;
        let ttl = self.ttl(expiration)?;

        self.client
            .set(&full_key, &text, ttl)
            .await
            .map_err(|e| backend(format_args!("setting value for key '{key}'"), e))
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let full_key = self.full_key(key)?;

        self.client
            .delete(&full_key)
            .await
            .map_err(|e| backend(format_args!("removing key '{key}'"), e))
    }

    async fn contains_key(&self, key: &str) -> Result<bool> {
        let full_key = self.full_key(key)?;

        self.client
            .exists(&full_key)
            .await
            .map_err(|e| backend(format_args!("checking key '{key}'"), e))
    }
}
