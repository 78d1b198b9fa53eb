// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The key-value engine boundary.

use std::time::Duration;

use cacheplex_provider::BoxError;

/// An already-connected key-value client.
///
/// This is the only surface [`RedisCacheProvider`][crate::RedisCacheProvider] needs from the
/// engine. Connection management, pooling and reconnects belong to the implementation.
/// Every method reports engine failures as a boxed error; "not found" is a normal result.
pub trait KeyValueClient: Send + Sync + 'static {
    /// Identifies the server this client is connected to.
    fn endpoint(&self) -> &str;

    /// Reads the text stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, BoxError>> + Send;

    /// Writes `value` under `key`, expiring after `ttl` when given.
    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Writes `value` only when `key` holds nothing. Returns whether the write happened.
    fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Deletes `key`. Returns whether anything was deleted.
    fn delete(&self, key: &str) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Returns whether `key` holds a value.
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Atomically adds `delta` to the integer under `key`, treating a missing key as zero.
    fn incr_by(&self, key: &str, delta: i64) -> impl Future<Output = Result<i64, BoxError>> + Send;

    /// Sets (or with `None`, clears) the expiration of `key`. Returns whether the key exists.
    fn expire(&self, key: &str, ttl: Option<Duration>) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Returns the remaining time-to-live of `key`, or `None` when the key is missing or
    /// never expires.
    fn ttl(&self, key: &str) -> impl Future<Output = Result<Option<Duration>, BoxError>> + Send;

    /// Prepends `value` to the list under `key`, creating the list when missing. Returns the
    /// list's length after the push.
    fn lpush(&self, key: &str, value: &str) -> impl Future<Output = Result<u64, BoxError>> + Send;

    /// Appends `value` to the list under `key`, creating the list when missing. Returns the
    /// list's length after the push.
    fn rpush(&self, key: &str, value: &str) -> impl Future<Output = Result<u64, BoxError>> + Send;

    /// Removes and returns the first element of the list under `key`.
    fn lpop(&self, key: &str) -> impl Future<Output = Result<Option<String>, BoxError>> + Send;

    /// Removes and returns the last element of the list under `key`.
    fn rpop(&self, key: &str) -> impl Future<Output = Result<Option<String>, BoxError>> + Send;

    /// Returns the length of the list under `key`; zero when missing.
    fn llen(&self, key: &str) -> impl Future<Output = Result<u64, BoxError>> + Send;

    /// Writes `field` of the hash under `key`. Returns whether the field is new.
    fn hset(&self, key: &str, field: &str, value: &str) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Reads `field` of the hash under `key`.
    fn hget(&self, key: &str, field: &str) -> impl Future<Output = Result<Option<String>, BoxError>> + Send;

    /// Deletes `field` of the hash under `key`. Returns whether it existed.
    fn hdel(&self, key: &str, field: &str) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Returns whether the hash under `key` has `field`.
    fn hexists(&self, key: &str, field: &str) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Returns the number of fields in the hash under `key`; zero when missing.
    fn hlen(&self, key: &str) -> impl Future<Output = Result<u64, BoxError>> + Send;
}
