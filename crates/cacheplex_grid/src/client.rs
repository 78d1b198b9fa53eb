// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The grid engine boundary.

use std::time::Duration;

use cacheplex_provider::{BoxError, LockToken};

use crate::ConnectionSettings;

/// An opened named cache on a distributed grid.
///
/// Values travel as JSON text. The grid enforces lock exclusivity and counter atomicity
/// across every client connected to the same cache; "not found" and "lock not granted" are
/// normal results, never errors.
pub trait GridClient: Send + Sync + 'static {
    /// Name of the opened cache.
    fn cache_name(&self) -> &str;

    /// Reads the text stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, BoxError>> + Send;

    /// Writes `value` under `key`, replacing any previous value.
    fn insert(&self, key: &str, value: &str, ttl: Option<Duration>) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Writes `value` only when `key` holds nothing. Returns whether the write happened.
    fn add(&self, key: &str, value: &str, ttl: Option<Duration>) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Removes `key`. Returns whether anything was removed.
    fn remove(&self, key: &str) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Returns whether `key` holds a value.
    fn contains(&self, key: &str) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Requests an exclusive lock on `key`, waiting up to `wait` for a current holder.
    ///
    /// A granted lock lapses after `lease` unless released first. Returns `None` when the
    /// lock was not granted in time.
    fn lock(&self, key: &str, wait: Duration, lease: Duration) -> impl Future<Output = Result<Option<LockToken>, BoxError>> + Send;

    /// Releases the lock on `key` if `token` still owns it. Returns whether it did.
    fn unlock(&self, key: &str, token: &LockToken) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Releases any lock on `key`. Returns whether one was held.
    fn force_unlock(&self, key: &str) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Atomically adds `delta` to the integer stored under `key` and returns the result.
    ///
    /// Fails when the key is missing or does not hold an integer.
    fn increment_by(&self, key: &str, delta: i64) -> impl Future<Output = Result<i64, BoxError>> + Send;
}

/// Opens named caches on a grid.
///
/// This is the grid's cache manager: it owns cluster discovery and connection setup, and
/// hands out one [`GridClient`] per opened cache.
pub trait GridConnector: Send + Sync {
    /// The client for an opened cache.
    type Client: GridClient;

    /// Opens `cache_name` using `settings`.
    ///
    /// # Errors
    ///
    /// Returns the engine error when the cache does not exist or cannot be reached.
    fn connect(&self, cache_name: &str, settings: &ConnectionSettings) -> Result<Self::Client, BoxError>;
}
