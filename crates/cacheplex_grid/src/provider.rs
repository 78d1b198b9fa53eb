// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Grid provider with key locks and counters.

use std::fmt::{self, Display};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use anyspawn::Spawner;
use cacheplex_provider::{
    BoxError, CacheProvider, CacheValue, DEFAULT_LOCK_WAIT, Error, Expiration, LockHandle, LockRelease, LockToken,
    LockingProvider, Result, codec, validate,
};
use futures::future::BoxFuture;
use tick::Clock;

use crate::GridClient;
use crate::options::DEFAULT_LOCK_LEASE;

/// A cache provider over one named cache of a distributed grid.
///
/// Besides the cache contract it implements [`LockingProvider`]: locks and counters are
/// delegated to the grid, which arbitrates between every client of the cache. Lock handles
/// dropped without release are released in the background on the provider's [`Spawner`].
pub struct GridCacheProvider<C> {
    client: Arc<C>,
    clock: Clock,
    spawner: Spawner,
    default_lock_wait: Duration,
    lock_lease: Duration,
}

impl<C> Clone for GridCacheProvider<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            clock: self.clock.clone(),
            spawner: self.spawner.clone(),
            default_lock_wait: self.default_lock_wait,
            lock_lease: self.lock_lease,
        }
    }
}

impl<C: GridClient> fmt::Debug for GridCacheProvider<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridCacheProvider")
            .field("cache_name", &self.client.cache_name())
            .field("default_lock_wait", &self.default_lock_wait)
            .field("lock_lease", &self.lock_lease)
            .finish_non_exhaustive()
    }
}

fn backend(action: impl Display, error: BoxError) -> Error {
    tracing::debug!(cache.action = %action, error = %error, "grid call failed");
    Error::backend(action.to_string(), error)
}

async fn unlock<C: GridClient>(client: &C, key: &str, token: &LockToken) -> Result<()> {
    let released = client
        .unlock(key, token)
        .await
        .map_err(|e| backend(format_args!("releasing lock on key '{key}'"), e))?;

    if released { Ok(()) } else { Err(Error::lock_not_held(key)) }
}

impl<C: GridClient> GridCacheProvider<C> {
    /// Creates a provider over an opened grid cache.
    ///
    /// Lock requests wait [`DEFAULT_LOCK_WAIT`] by default and granted locks lapse after
    /// [`DEFAULT_LOCK_LEASE`][crate::DEFAULT_LOCK_LEASE].
    #[must_use]
    pub fn new(client: Arc<C>, clock: Clock, spawner: Spawner) -> Self {
        Self {
            client,
            clock,
            spawner,
            default_lock_wait: DEFAULT_LOCK_WAIT,
            lock_lease: DEFAULT_LOCK_LEASE,
        }
    }

    /// Sets how long lock requests wait when the caller gives no wait.
    #[must_use]
    pub fn with_default_lock_wait(mut self, wait: Duration) -> Self {
        self.default_lock_wait = wait;
        self
    }

    /// Sets how long a granted lock lives when never released.
    #[must_use]
    pub fn with_lock_lease(mut self, lease: Duration) -> Self {
        self.lock_lease = lease;
        self
    }

    /// Returns the name of the opened cache.
    #[must_use]
    pub fn cache_name(&self) -> &str {
        self.client.cache_name()
    }

    /// Returns the underlying client.
    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns how long lock requests wait when the caller gives no wait.
    #[must_use]
    pub fn default_lock_wait(&self) -> Duration {
        self.default_lock_wait
    }

    /// Stores `value` only when `key` holds nothing. Returns `false` when a value was
    /// already present.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey`, `InvalidValue`, or a backend error.
    pub async fn add<T: CacheValue>(&self, key: &str, value: &T, expiration: Expiration) -> Result<bool> {
        validate::key(key)?;
        let text = codec::encode(value)?;
        let ttl = expiration.normalize(self.clock.system_time())?;

        self.client
            .add(key, &text, ttl)
            .await
            .map_err(|e| backend(format_args!("adding value for key '{key}'"), e))
    }

    async fn seed_counter(&self, key: &str, value: i64) -> Result<bool> {
        self.client
            .add(key, &value.to_string(), None)
            .await
            .map_err(|e| backend(format_args!("seeding counter for key '{key}'"), e))
    }

    fn handle(&self, key: &str, token: LockToken) -> LockHandle {
        LockHandle::new(key, token, Arc::new(self.clone()))
    }
}

impl<C: GridClient> CacheProvider for GridCacheProvider<C> {
    async fn get<T: CacheValue>(&self, key: &str) -> Result<Option<T>> {
        validate::key(key)?;

        let text = self
            .client
            .get(key)
            .await
            .map_err(|e| backend(format_args!("getting value for key '{key}'"), e))?;

        text.map(|text| codec::decode(key, &text)).transpose()
    }

    async fn set<T: CacheValue>(&self, key: &str, value: &T, expiration: Expiration) -> Result<()> {
        validate::key(key)?;
        let text = codec::encode(value)?;
        let ttl = expiration.normalize(self.clock.system_time())?;

        self.client
            .insert(key, &text, ttl)
            .await
            .map_err(|e| backend(format_args!("setting value for key '{key}'"), e))
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        validate::key(key)?;

        self.client
            .remove(key)
            .await
            .map_err(|e| backend(format_args!("removing key '{key}'"), e))
    }

    async fn contains_key(&self, key: &str) -> Result<bool> {
        validate::key(key)?;

        self.client
            .contains(key)
            .await
            .map_err(|e| backend(format_args!("checking key '{key}'"), e))
    }
}

impl<C: GridClient> LockingProvider for GridCacheProvider<C> {
    async fn acquire_lock(&self, key: &str, wait: Option<Duration>) -> Result<LockHandle> {
        validate::key(key)?;
        let wait = wait.unwrap_or(self.default_lock_wait);

        let token = self
            .client
            .lock(key, wait, self.lock_lease)
            .await
            .map_err(|e| backend(format_args!("acquiring lock on key '{key}'"), e))?;

        match token {
            Some(token) => Ok(self.handle(key, token)),
            None => Err(Error::lock_timeout(key, wait)),
        }
    }

    async fn get_and_lock<T: CacheValue>(&self, key: &str, wait: Option<Duration>) -> Result<(Option<T>, LockHandle)> {
        let handle = self.acquire_lock(key, wait).await?;

        match self.get::<T>(key).await {
            Ok(value) => Ok((value, handle)),
            Err(error) => {
                if let Err(release_error) = handle.release().await {
                    tracing::debug!(cache.key = key, error = %release_error, "releasing lock after failed read");
                }
                Err(error)
            }
        }
    }

    async fn release_lock(&self, key: &str) -> Result<()> {
        validate::key(key)?;

        let released = self
            .client
            .force_unlock(key)
            .await
            .map_err(|e| backend(format_args!("releasing lock on key '{key}'"), e))?;

        if released { Ok(()) } else { Err(Error::lock_not_held(key)) }
    }

    async fn increment(&self, key: &str, seed: i64, delta: i64) -> Result<i64> {
        validate::key(key)?;
        let first = seed.checked_add(delta).ok_or_else(|| Error::invalid_value("delta"))?;

        // Seed and delta land in one write, so readers never observe the bare seed.
        if self.seed_counter(key, first).await? {
            return Ok(first);
        }

        match self.client.increment_by(key, delta).await {
            Ok(value) => Ok(value),
            Err(error) => {
                // A counter removed after the seeding attempt is seeded again, once.
                let present = self
                    .client
                    .contains(key)
                    .await
                    .map_err(|e| backend(format_args!("checking key '{key}'"), e))?;
                if !present && self.seed_counter(key, first).await? {
                    return Ok(first);
                }
                Err(backend(format_args!("incrementing value for key '{key}'"), error))
            }
        }
    }
}

impl<C: GridClient> LockRelease for GridCacheProvider<C> {
    fn release<'a>(&'a self, key: &'a str, token: &'a LockToken) -> BoxFuture<'a, Result<()>> {
        Box::pin(unlock(&*self.client, key, token))
    }

    fn release_detached(&self, key: String, token: LockToken) {
        // Spawning outside a runtime panics, and a second panic during unwinding aborts.
        if std::thread::panicking() && tokio::runtime::Handle::try_current().is_err() {
            tracing::warn!(cache.key = %key, "no runtime for background lock release, lock lapses with its lease");
            return;
        }

        let client = Arc::clone(&self.client);
        let task_key = key.clone();
        let spawned = panic::catch_unwind(AssertUnwindSafe(|| {
            self.spawner.spawn(async move {
                if let Err(error) = unlock(&*client, &task_key, &token).await {
                    tracing::debug!(cache.key = %task_key, error = %error, "background lock release failed");
                }
            })
        }));

        if spawned.is_err() {
            tracing::warn!(cache.key = %key, "background lock release could not be spawned, lock lapses with its lease");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeGrid;

    fn provider() -> GridCacheProvider<FakeGrid> {
        let clock = Clock::new_frozen();
        GridCacheProvider::new(Arc::new(FakeGrid::new("c", clock.clone())), clock, Spawner::new_tokio())
    }

    #[test]
    fn defaults_come_from_the_lock_constants() {
        let provider = provider();

        assert_eq!(provider.default_lock_wait(), DEFAULT_LOCK_WAIT);
        assert_eq!(provider.lock_lease, DEFAULT_LOCK_LEASE);
        assert_eq!(provider.cache_name(), "c");
    }

    #[test]
    fn builders_override_lock_timing() {
        let provider = provider()
            .with_default_lock_wait(Duration::from_secs(1))
            .with_lock_lease(Duration::from_secs(2));

        assert_eq!(provider.default_lock_wait(), Duration::from_secs(1));
        assert_eq!(provider.lock_lease, Duration::from_secs(2));
    }

    #[test]
    fn debug_shows_cache_name() {
        let debug = format!("{:?}", provider());

        assert!(debug.contains("GridCacheProvider"));
        assert!(debug.contains("cache_name: \"c\""));
    }
}
