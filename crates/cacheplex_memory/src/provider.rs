// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory provider implementation using moka.

use std::any::{Any, type_name};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cacheplex_provider::{CacheProvider, CacheValue, Error, Expiration, Result, codec, validate};
use moka::Expiry;
use moka::future::Cache;
use tick::Clock;

use crate::MemoryProviderOptions;

/// A stored value together with its own time-to-live.
#[derive(Clone)]
struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    ttl: Option<Duration>,
}

impl Entry {
    fn new<T: CacheValue>(value: T, ttl: Option<Duration>) -> Self {
        Self {
            value: Arc::new(value),
            ttl,
        }
    }

    fn read<T: CacheValue>(&self, key: &str) -> Result<T> {
        self.value.downcast_ref::<T>().cloned().ok_or_else(|| {
            Error::backend(
                format!("getting value for key '{key}'"),
                format!("stored value is not a `{}`", type_name::<T>()),
            )
        })
    }
}

/// Per-entry expiration: every write restarts the entry's own time-to-live.
struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(&self, _key: &String, value: &Entry, _updated_at: Instant, _duration_until_expiry: Option<Duration>) -> Option<Duration> {
        value.ttl
    }
}

/// A cache provider backed by an in-process moka table.
///
/// This provider offers:
/// - Concurrent access without serialization: values are stored as they are
/// - Per-entry expiration alongside optional table-wide TTL/TTI
/// - Capacity-bounded eviction
///
/// Reading a key as a different type than it was written with is a backend error.
///
/// # Examples
///
/// ```
/// use cacheplex_memory::{MemoryCacheProvider, MemoryProviderOptions};
/// use cacheplex_provider::{CacheProvider, Expiration};
/// use tick::Clock;
/// # futures::executor::block_on(async {
///
/// let provider = MemoryCacheProvider::new(&MemoryProviderOptions::new(), Clock::new_frozen()).unwrap();
///
/// provider.set("key", &42, Expiration::never()).await.unwrap();
/// assert_eq!(provider.get::<i32>("key").await.unwrap(), Some(42));
/// # });
/// ```
#[derive(Clone)]
pub struct MemoryCacheProvider {
    inner: Cache<String, Entry>,
    clock: Clock,
    name: Option<Arc<str>>,
}

impl std::fmt::Debug for MemoryCacheProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCacheProvider")
            .field("name", &self.name)
            .field("entry_count", &self.inner.entry_count())
            .finish_non_exhaustive()
    }
}

impl MemoryCacheProvider {
    /// Creates a provider with its own table.
    ///
    /// The clock resolves absolute expirations.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when the options are invalid.
    pub fn new(options: &MemoryProviderOptions, clock: Clock) -> Result<Self> {
        options.validate()?;

        let mut builder = Cache::builder().expire_after(EntryExpiry);

        if let Some(capacity) = options.max_capacity {
            builder = builder.max_capacity(capacity);
        }

        if let Some(capacity) = options.initial_capacity {
            builder = builder.initial_capacity(capacity);
        }

        if let Some(ttl) = options.time_to_live {
            builder = builder.time_to_live(ttl);
        }

        if let Some(tti) = options.time_to_idle {
            builder = builder.time_to_idle(tti);
        }

        if let Some(name) = options.name.as_deref() {
            builder = builder.name(name);
        }

        Ok(Self {
            inner: builder.build(),
            clock,
            name: options.name.as_deref().map(Arc::from),
        })
    }

    /// Returns the table name, if one was configured.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the approximate number of live entries.
    ///
    /// The count lags behind recent writes until pending maintenance runs; see
    /// [`Self::run_pending_tasks`].
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Runs pending eviction and expiration maintenance now.
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }

    /// Discards every entry.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Returns the value under `key`, computing and storing it with `init` on a miss.
    ///
    /// Concurrent callers for the same key share one computation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey`, `InvalidValue` for a past expiration or a null computed value,
    /// or a backend error when the key holds a value of another type.
    pub async fn get_or_insert_with<T, F>(&self, key: &str, expiration: Expiration, init: F) -> Result<T>
    where
        T: CacheValue,
        F: FnOnce() -> T + Send,
    {
        self.get_or_try_insert_with(key, expiration, move || async move { Ok(init()) }).await
    }

    /// Returns the value under `key`, computing and storing it with the fallible `init` on a miss.
    ///
    /// Nothing is stored when `init` fails. Concurrent callers for the same key share one
    /// computation and observe the same outcome.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `init`, or the errors of [`Self::get_or_insert_with`].
    pub async fn get_or_try_insert_with<T, F, Fut>(&self, key: &str, expiration: Expiration, init: F) -> Result<T>
    where
        T: CacheValue,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        validate::key(key)?;
        let ttl = expiration.normalize(self.clock.system_time())?;

        let entry = self
            .inner
            .try_get_with_by_ref(key, async move {
                let value = init().await?;
                codec::ensure_not_null(&value)?;
                Ok::<_, Error>(Entry::new(value, ttl))
            })
            .await
            .map_err(|shared| Arc::try_unwrap(shared).unwrap_or_else(|shared| Error::from_kind(shared.kind().clone())))?;

        entry.read(key)
    }
}

impl CacheProvider for MemoryCacheProvider {
    async fn get<T: CacheValue>(&self, key: &str) -> Result<Option<T>> {
        validate::key(key)?;
        match self.inner.get(key).await {
            Some(entry) => entry.read(key).map(Some),
            None => Ok(None),
        }
    }

    async fn set<T: CacheValue>(&self, key: &str, value: &T, expiration: Expiration) -> Result<()> {
        validate::key(key)?;
        codec::ensure_not_null(value)?;
        let ttl = expiration.normalize(self.clock.system_time())?;

        self.inner.insert(key.to_string(), Entry::new(value.clone(), ttl)).await;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        validate::key(key)?;
        Ok(self.inner.remove(key).await.is_some())
    }

    async fn contains_key(&self, key: &str) -> Result<bool> {
        validate::key(key)?;
        Ok(self.inner.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use cacheplex_provider::ErrorKind;
    use tick::ClockControl;

    use super::*;

    fn block_on<F: Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    fn provider() -> MemoryCacheProvider {
        MemoryCacheProvider::new(&MemoryProviderOptions::new(), Clock::new_frozen()).unwrap()
    }

    #[test]
    fn type_mismatch_is_a_backend_error() {
        block_on(async {
            let provider = provider();
            provider.set("k", &1_u8, Expiration::never()).await.unwrap();

            let err = provider.get::<String>("k").await.unwrap_err();

            assert!(err.is_backend());
            assert!(err.to_string().contains("getting value for key 'k'"));
        });
    }

    #[test]
    fn absolute_expiration_is_resolved_with_the_clock() {
        block_on(async {
            let control = ClockControl::new();
            let provider = MemoryCacheProvider::new(&MemoryProviderOptions::new(), control.to_clock()).unwrap();
            let now = control.to_clock().system_time();

            let err = provider.set("k", &1, Expiration::at(now)).await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidValue { parameter: "expiration" });

            provider
                .set("k", &1, Expiration::at(now + Duration::from_secs(60)))
                .await
                .unwrap();
            assert_eq!(provider.get::<i32>("k").await.unwrap(), Some(1));
        });
    }

    #[test]
    fn failed_init_stores_nothing() {
        block_on(async {
            let provider = provider();

            let err = provider
                .get_or_try_insert_with("k", Expiration::never(), || async { Err::<i32, _>(Error::invalid_value("seed")) })
                .await
                .unwrap_err();

            assert_eq!(err.kind(), &ErrorKind::InvalidValue { parameter: "seed" });
            assert!(!provider.contains_key("k").await.unwrap());
        });
    }

    #[test]
    fn null_init_value_is_rejected() {
        block_on(async {
            let provider = provider();

            let err = provider
                .get_or_insert_with("k", Expiration::never(), || None::<i32>)
                .await
                .unwrap_err();

            assert_eq!(err.kind(), &ErrorKind::InvalidValue { parameter: "value" });
        });
    }

    #[test]
    fn invalid_options_are_rejected() {
        let options = MemoryProviderOptions::new().time_to_idle(Duration::ZERO);

        assert!(MemoryCacheProvider::new(&options, Clock::new_frozen()).is_err());
    }
}
