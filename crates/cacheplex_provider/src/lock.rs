// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Pessimistic key locking and seeded atomic counters.
//!
//! [`LockingProvider`] is an opt-in extension of [`CacheProvider`] for backends that expose
//! locking primitives. The backend is the only arbiter of mutual exclusion and counter
//! atomicity; nothing here adds an in-process lock of its own.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use crate::{CacheProvider, CacheValue, Error, Result};

/// How long lock acquisition waits when the caller does not say.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(30);

/// Opaque identifier of a lock lease issued by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockToken(String);

impl LockToken {
    /// Wraps a backend-issued lock identifier.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the identifier as issued by the backend.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Releases locks on behalf of a [`LockHandle`].
///
/// Implemented by providers that issue lock handles.
pub trait LockRelease: Send + Sync + fmt::Debug {
    /// Releases the lease identified by `token` on `key`.
    ///
    /// Fails with `LockNotHeld` when the lease has expired or belongs to someone else.
    fn release<'a>(&'a self, key: &'a str, token: &'a LockToken) -> BoxFuture<'a, Result<()>>;

    /// Releases the lease without waiting for the outcome.
    ///
    /// Called when a handle is dropped without an explicit release.
    fn release_detached(&self, key: String, token: LockToken);
}

/// Proof of holding a lock on one key.
///
/// A handle is released exactly once: [`LockHandle::release`] consumes it, and a handle
/// dropped without being released (early return, panic, cancelled task) hands its lease
/// back through [`LockRelease::release_detached`].
#[derive(Debug)]
pub struct LockHandle {
    key: String,
    token: LockToken,
    releaser: Option<Arc<dyn LockRelease>>,
}

impl LockHandle {
    /// Creates a handle for a lease on `key`.
    #[must_use]
    pub fn new(key: impl Into<String>, token: LockToken, releaser: Arc<dyn LockRelease>) -> Self {
        Self {
            key: key.into(),
            token,
            releaser: Some(releaser),
        }
    }

    /// Returns the locked key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the lease token.
    #[must_use]
    pub fn token(&self) -> &LockToken {
        &self.token
    }

    /// Releases the lock.
    ///
    /// # Errors
    ///
    /// Returns `LockNotHeld` when the lease expired before release, or a backend error when
    /// the backend could not be reached.
    pub async fn release(mut self) -> Result<()> {
        let result = match &self.releaser {
            Some(releaser) => releaser.release(&self.key, &self.token).await,
            None => Ok(()),
        };
        self.releaser = None;
        result
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        if let Some(releaser) = self.releaser.take() {
            tracing::warn!(cache.key = %self.key, "lock handle dropped without release, releasing in background");
            releaser.release_detached(std::mem::take(&mut self.key), self.token.clone());
        }
    }
}

/// Locking and counter operations for backends that support them.
///
/// Every operation validates its key first. Lock waits are always finite: when `wait`
/// is `None` the provider applies its configured default (see [`DEFAULT_LOCK_WAIT`]).
pub trait LockingProvider: CacheProvider {
    /// Acquires an exclusive lock on `key`, waiting up to `wait`.
    ///
    /// Fails with `LockTimeout` when the lock is still held by someone else after the wait.
    fn acquire_lock(&self, key: &str, wait: Option<Duration>) -> impl Future<Output = Result<LockHandle>> + Send;

    /// Locks `key` and then reads its value.
    ///
    /// The read only happens once the lock is held. If the read fails the lock is released
    /// before the error is returned.
    fn get_and_lock<T: CacheValue>(
        &self,
        key: &str,
        wait: Option<Duration>,
    ) -> impl Future<Output = Result<(Option<T>, LockHandle)>> + Send;

    /// Releases whatever lock is held on `key`, regardless of holder.
    ///
    /// Fails with `LockNotHeld` when the key is not locked.
    fn release_lock(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// Adds `delta` to the counter under `key` and returns the new value.
    ///
    /// A missing counter is created so that the first observable value is `seed + delta`;
    /// `seed` itself is never visible to readers.
    fn increment(&self, key: &str, seed: i64, delta: i64) -> impl Future<Output = Result<i64>> + Send;

    /// Subtracts `delta` from the counter under `key` and returns the new value.
    ///
    /// A missing counter is created so that the first observable value is `seed - delta`.
    fn decrement(&self, key: &str, seed: i64, delta: i64) -> impl Future<Output = Result<i64>> + Send {
        async move {
            let negated = delta.checked_neg().ok_or_else(|| Error::invalid_value("delta"))?;
            self.increment(key, seed, negated).await
        }
    }

    /// Runs `work` while holding the lock on `key`.
    ///
    /// The lock is released on every exit path of `work`. When `work` fails its error is
    /// returned; otherwise a failed release is reported.
    ///
    /// # Examples
    ///
    /// ```
    /// use cacheplex_provider::{CacheProvider, Expiration, LockingProvider, Result};
    ///
    /// async fn bump<P: LockingProvider>(provider: &P) -> Result<i32> {
    ///     provider
    ///         .with_lock("visits", None, || async {
    ///             let visits = provider.get::<i32>("visits").await?.unwrap_or_default() + 1;
    ///             provider.set("visits", &visits, Expiration::never()).await?;
    ///             Ok(visits)
    ///         })
    ///         .await
    /// }
    /// ```
    fn with_lock<F, Fut, R>(&self, key: &str, wait: Option<Duration>, work: F) -> impl Future<Output = Result<R>> + Send
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<R>> + Send,
        R: Send,
    {
        async move {
            let handle = self.acquire_lock(key, wait).await?;
            let outcome = work().await;
            let released = handle.release().await;

            match (outcome, released) {
                (Err(error), _) | (Ok(_), Err(error)) => Err(error),
                (Ok(value), Ok(())) => Ok(value),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, Default)]
    struct CountingRelease {
        awaited: AtomicUsize,
        detached: AtomicUsize,
    }

    impl LockRelease for CountingRelease {
        fn release<'a>(&'a self, _key: &'a str, _token: &'a LockToken) -> BoxFuture<'a, Result<()>> {
            self.awaited.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }

        fn release_detached(&self, _key: String, _token: LockToken) {
            self.detached.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn release_runs_once_and_disarms_drop() {
        let counter = Arc::new(CountingRelease::default());
        let handle = LockHandle::new("k", LockToken::new("t1"), Arc::clone(&counter) as Arc<dyn LockRelease>);

        futures::executor::block_on(handle.release()).unwrap();

        assert_eq!(counter.awaited.load(Ordering::SeqCst), 1);
        assert_eq!(counter.detached.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dropped_handle_releases_in_background() {
        let counter = Arc::new(CountingRelease::default());
        let handle = LockHandle::new("k", LockToken::new("t1"), Arc::clone(&counter) as Arc<dyn LockRelease>);

        assert_eq!(handle.key(), "k");
        assert_eq!(handle.token().as_str(), "t1");
        drop(handle);

        assert_eq!(counter.awaited.load(Ordering::SeqCst), 0);
        assert_eq!(counter.detached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn token_display_is_the_raw_identifier() {
        assert_eq!(LockToken::new("lease-7").to_string(), "lease-7");
    }
}
