// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock provider implementation for testing.
//!
//! This module provides `MockProvider`, an in-memory provider that records all
//! operations and supports failure injection for testing error paths.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;

use crate::{
    CacheProvider, CacheValue, DEFAULT_LOCK_WAIT, Error, Expiration, LockHandle, LockRelease, LockToken, LockingProvider, Result, codec, validate,
};

/// Recorded provider operation with full context.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOp {
    /// A get operation was performed with the given key.
    Get(String),
    /// A set operation was performed.
    Set {
        /// The key that was written.
        key: String,
        /// The value as JSON.
        value: Value,
        /// The requested expiration.
        expiration: Expiration,
    },
    /// A remove operation was performed with the given key.
    Remove(String),
    /// A contains operation was performed with the given key.
    ContainsKey(String),
    /// A lock was requested on the given key.
    Lock(String),
    /// A lock on the given key was released.
    Unlock(String),
    /// A counter was incremented.
    Increment {
        /// The counter key.
        key: String,
        /// The seed for a missing counter.
        seed: i64,
        /// The amount added.
        delta: i64,
    },
}

type FailPredicate = Box<dyn Fn(&ProviderOp) -> bool + Send + Sync>;

#[derive(Default)]
struct State {
    data: Mutex<HashMap<String, Value>>,
    locks: Mutex<HashMap<String, LockToken>>,
    operations: Mutex<Vec<ProviderOp>>,
    fail_when: Mutex<Option<FailPredicate>>,
    next_token: AtomicU64,
}

/// A configurable mock provider for testing.
///
/// Values are kept as JSON so any [`CacheValue`] round-trips. Locks never wait: a lock
/// request on a locked key fails immediately with `LockTimeout`, reporting the requested
/// wait or [`DEFAULT_LOCK_WAIT`]. A handle only releases the lock it was issued. Operations rejected by
/// key validation are not recorded, which lets tests assert that no backend work happened.
///
/// # Examples
///
/// ```
/// use cacheplex_provider::testing::{MockProvider, ProviderOp};
/// use cacheplex_provider::{CacheProvider, Expiration};
///
/// # futures::executor::block_on(async {
/// let provider = MockProvider::new();
///
/// provider.set("key", &42, Expiration::never()).await.unwrap();
/// assert_eq!(provider.get::<i32>("key").await.unwrap(), Some(42));
///
/// // Fail only specific keys
/// provider.fail_when(|op| matches!(op, ProviderOp::Get(k) if k == "forbidden"));
/// assert!(provider.get::<i32>("forbidden").await.is_err());
/// assert!(provider.get::<i32>("allowed").await.is_ok());
/// # });
/// ```
#[derive(Clone, Default)]
pub struct MockProvider {
    state: Arc<State>,
}

impl std::fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProvider")
            .field("data", &self.state.data)
            .field("locks", &self.state.locks)
            .field("operations", &self.state.operations)
            .field("fail_when", &self.state.fail_when.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl MockProvider {
    /// Creates a new empty mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.state.data.lock().len()
    }

    /// Returns the raw JSON stored under `key`.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<Value> {
        self.state.data.lock().get(key).cloned()
    }

    /// Returns whether `key` is currently locked.
    #[must_use]
    pub fn is_locked(&self, key: &str) -> bool {
        self.state.locks.lock().contains_key(key)
    }

    /// Sets a predicate that determines which operations fail.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&ProviderOp) -> bool + Send + Sync + 'static,
    {
        *self.state.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.state.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<ProviderOp> {
        self.state.operations.lock().clone()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.state.operations.lock().clear();
    }

    fn record(&self, op: ProviderOp, action: &str) -> Result<()> {
        let fail = self.state.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        self.state.operations.lock().push(op);
        if fail {
            return Err(Error::backend(action.to_string(), "mock: operation failed"));
        }
        Ok(())
    }

    /// Releases `key`, only when `token` owns it if one is given.
    fn unlock(&self, key: &str, token: Option<&LockToken>) -> Result<()> {
        self.record(ProviderOp::Unlock(key.to_string()), &format!("releasing lock on key '{key}'"))?;
        let mut locks = self.state.locks.lock();
        match (locks.get(key), token) {
            (Some(held), Some(token)) if held != token => Err(Error::lock_not_held(key)),
            (Some(_), _) => {
                locks.remove(key);
                Ok(())
            }
            (None, _) => Err(Error::lock_not_held(key)),
        }
    }
}

impl CacheProvider for MockProvider {
    async fn get<T: CacheValue>(&self, key: &str) -> Result<Option<T>> {
        validate::key(key)?;
        self.record(ProviderOp::Get(key.to_string()), &format!("getting value for key '{key}'"))?;
        let raw = self.state.data.lock().get(key).cloned();
        raw.map(|value| serde_json::from_value(value).map_err(|e| Error::backend(format!("deserializing value for key '{key}'"), e)))
            .transpose()
    }

    async fn set<T: CacheValue>(&self, key: &str, value: &T, expiration: Expiration) -> Result<()> {
        validate::key(key)?;
        let text = codec::encode(value)?;
        let value: Value = serde_json::from_str(&text).map_err(|e| Error::backend("re-reading encoded value", e))?;
        self.record(
            ProviderOp::Set {
                key: key.to_string(),
                value: value.clone(),
                expiration,
            },
            &format!("setting value for key '{key}'"),
        )?;
        self.state.data.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        validate::key(key)?;
        self.record(ProviderOp::Remove(key.to_string()), &format!("removing key '{key}'"))?;
        Ok(self.state.data.lock().remove(key).is_some())
    }

    async fn contains_key(&self, key: &str) -> Result<bool> {
        validate::key(key)?;
        self.record(ProviderOp::ContainsKey(key.to_string()), &format!("checking key '{key}'"))?;
        Ok(self.state.data.lock().contains_key(key))
    }
}

impl LockingProvider for MockProvider {
    async fn acquire_lock(&self, key: &str, wait: Option<Duration>) -> Result<LockHandle> {
        validate::key(key)?;
        self.record(ProviderOp::Lock(key.to_string()), &format!("locking key '{key}'"))?;
        let mut locks = self.state.locks.lock();
        if locks.contains_key(key) {
            return Err(Error::lock_timeout(key, wait.unwrap_or(DEFAULT_LOCK_WAIT)));
        }
        let token = LockToken::new(self.state.next_token.fetch_add(1, Ordering::Relaxed).to_string());
        locks.insert(key.to_string(), token.clone());
        Ok(LockHandle::new(key, token, Arc::new(self.clone())))
    }

    async fn get_and_lock<T: CacheValue>(&self, key: &str, wait: Option<Duration>) -> Result<(Option<T>, LockHandle)> {
        let handle = self.acquire_lock(key, wait).await?;
        match self.get(key).await {
            Ok(value) => Ok((value, handle)),
            Err(error) => {
                // Release failures are secondary to the read failure.
                let _ = handle.release().await;
                Err(error)
            }
        }
    }

    async fn release_lock(&self, key: &str) -> Result<()> {
        validate::key(key)?;
        self.unlock(key, None)
    }

    async fn increment(&self, key: &str, seed: i64, delta: i64) -> Result<i64> {
        validate::key(key)?;
        self.record(
            ProviderOp::Increment {
                key: key.to_string(),
                seed,
                delta,
            },
            &format!("incrementing counter '{key}'"),
        )?;
        let mut data = self.state.data.lock();
        let current = match data.get(key) {
            Some(value) => value
                .as_i64()
                .ok_or_else(|| Error::backend(format!("incrementing counter '{key}'"), "value is not an integer"))?,
            None => seed,
        };
        let next = current.checked_add(delta).ok_or_else(|| Error::invalid_value("delta"))?;
        data.insert(key.to_string(), Value::from(next));
        Ok(next)
    }
}

impl LockRelease for MockProvider {
    fn release<'a>(&'a self, key: &'a str, token: &'a LockToken) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.unlock(key, Some(token)) })
    }

    fn release_detached(&self, key: String, token: LockToken) {
        // Nothing to wait for in memory.
        let _ = self.unlock(&key, Some(&token));
    }
}
