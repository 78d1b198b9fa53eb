// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for cache providers.
//!
//! [`CacheProvider`] is the contract every backend satisfies. Callers that only need
//! get/set/remove/contains depend on this trait alone and stay unaware of the backend.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{Expiration, Result};

/// Values that can be stored in any provider.
///
/// Implemented for every type that serializes, deserializes and can be shared across tasks.
pub trait CacheValue: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Trait for cache provider implementations.
///
/// Every operation validates its key before any backend round trip: an empty or
/// whitespace-only key fails with `InvalidKey`. A key that holds no value is a miss
/// (`Ok(None)` / `Ok(false)`), never an error.
///
/// Providers are shared and called concurrently; implementations keep no per-call
/// mutable state.
pub trait CacheProvider: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// Returns `Ok(None)` on a miss. A stored value that cannot be read back as `T`
    /// is a backend error.
    fn get<T: CacheValue>(&self, key: &str) -> impl Future<Output = Result<Option<T>>> + Send;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// Fails with `InvalidValue` when the value is null or the expiration has already passed.
    fn set<T: CacheValue>(&self, key: &str, value: &T, expiration: Expiration) -> impl Future<Output = Result<()>> + Send;

    /// Removes the value stored under `key`.
    ///
    /// Returns `false` when there was nothing to remove.
    fn remove(&self, key: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Returns whether a value is stored under `key` without reading it.
    fn contains_key(&self, key: &str) -> impl Future<Output = Result<bool>> + Send;
}
