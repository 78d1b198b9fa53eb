// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Decorator that adds telemetry to any provider.

use std::time::Duration;

use cacheplex_provider::{CacheProvider, CacheValue, Expiration, LockHandle, LockingProvider, Result};
use tick::Clock;

use crate::telemetry::timing::timed;
use crate::telemetry::{CacheActivity, CacheOperation, CacheTelemetry, TelemetryConfig};

/// Wraps a provider and records every operation it performs.
///
/// Each call is timed on the provider's clock and reported with the cache name, the
/// operation and its outcome (hit, miss, inserted, contended, error, ...). Results and
/// errors pass through unchanged. `Instrumented` implements [`LockingProvider`] whenever
/// the wrapped provider does.
///
/// # Examples
///
/// ```ignore
/// use cacheplex::{Instrumented, MemoryProviderFactory, MemoryProviderOptions, ProviderFactory, TelemetryConfig};
/// use tick::Clock;
///
/// let clock = Clock::new_tokio();
/// let memory = MemoryProviderFactory::new(clock.clone()).create(MemoryProviderOptions::new())?;
/// let provider = Instrumented::new("sessions", memory, clock, &TelemetryConfig::new().with_logs());
/// ```
#[derive(Debug, Clone)]
pub struct Instrumented<P> {
    name: &'static str,
    inner: P,
    telemetry: CacheTelemetry,
}

impl<P> Instrumented<P> {
    /// Wraps `inner`, reporting under `name`.
    #[must_use]
    pub fn new(name: &'static str, inner: P, clock: Clock, config: &TelemetryConfig) -> Self {
        Self {
            name,
            inner,
            telemetry: config.build(clock),
        }
    }

    /// Returns the name reported with every event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the wrapped provider.
    #[must_use]
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Unwraps the provider.
    #[must_use]
    pub fn into_inner(self) -> P {
        self.inner
    }

    fn record(&self, operation: CacheOperation, activity: CacheActivity, duration: Duration) {
        self.telemetry.record(self.name, operation, activity, duration);
    }

    fn record_outcome<R>(&self, operation: CacheOperation, result: &Result<R>, success: CacheActivity, duration: Duration) {
        let activity = match result {
            Ok(_) => success,
            Err(e) => CacheActivity::failure(e),
        };
        self.record(operation, activity, duration);
    }
}

impl<P: CacheProvider> CacheProvider for Instrumented<P> {
    async fn get<T: CacheValue>(&self, key: &str) -> Result<Option<T>> {
        let outcome = timed(self.telemetry.clock(), self.inner.get::<T>(key)).await;
        let activity = match &outcome.result {
            Ok(Some(_)) => CacheActivity::Hit,
            Ok(None) => CacheActivity::Miss,
            Err(e) => CacheActivity::failure(e),
        };
        self.record(CacheOperation::Get, activity, outcome.duration);
        outcome.result
    }

    async fn set<T: CacheValue>(&self, key: &str, value: &T, expiration: Expiration) -> Result<()> {
        let outcome = timed(self.telemetry.clock(), self.inner.set(key, value, expiration)).await;
        self.record_outcome(CacheOperation::Set, &outcome.result, CacheActivity::Inserted, outcome.duration);
        outcome.result
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let outcome = timed(self.telemetry.clock(), self.inner.remove(key)).await;
        let activity = match &outcome.result {
            Ok(true) => CacheActivity::Removed,
            Ok(false) => CacheActivity::Absent,
            Err(e) => CacheActivity::failure(e),
        };
        self.record(CacheOperation::Remove, activity, outcome.duration);
        outcome.result
    }

    async fn contains_key(&self, key: &str) -> Result<bool> {
        let outcome = timed(self.telemetry.clock(), self.inner.contains_key(key)).await;
        let activity = match &outcome.result {
            Ok(true) => CacheActivity::Present,
            Ok(false) => CacheActivity::Absent,
            Err(e) => CacheActivity::failure(e),
        };
        self.record(CacheOperation::ContainsKey, activity, outcome.duration);
        outcome.result
    }
}

impl<P: LockingProvider> LockingProvider for Instrumented<P> {
    async fn acquire_lock(&self, key: &str, wait: Option<Duration>) -> Result<LockHandle> {
        let outcome = timed(self.telemetry.clock(), self.inner.acquire_lock(key, wait)).await;
        self.record_outcome(CacheOperation::AcquireLock, &outcome.result, CacheActivity::Locked, outcome.duration);
        outcome.result
    }

    async fn get_and_lock<T: CacheValue>(&self, key: &str, wait: Option<Duration>) -> Result<(Option<T>, LockHandle)> {
        let outcome = timed(self.telemetry.clock(), self.inner.get_and_lock::<T>(key, wait)).await;
        let activity = match &outcome.result {
            Ok((Some(_), _)) => CacheActivity::Hit,
            Ok((None, _)) => CacheActivity::Miss,
            Err(e) => CacheActivity::failure(e),
        };
        self.record(CacheOperation::GetAndLock, activity, outcome.duration);
        outcome.result
    }

    async fn release_lock(&self, key: &str) -> Result<()> {
        let outcome = timed(self.telemetry.clock(), self.inner.release_lock(key)).await;
        self.record_outcome(CacheOperation::ReleaseLock, &outcome.result, CacheActivity::Released, outcome.duration);
        outcome.result
    }

    async fn increment(&self, key: &str, seed: i64, delta: i64) -> Result<i64> {
        let outcome = timed(self.telemetry.clock(), self.inner.increment(key, seed, delta)).await;
        self.record_outcome(CacheOperation::Increment, &outcome.result, CacheActivity::Counted, outcome.duration);
        outcome.result
    }

    async fn decrement(&self, key: &str, seed: i64, delta: i64) -> Result<i64> {
        let outcome = timed(self.telemetry.clock(), self.inner.decrement(key, seed, delta)).await;
        self.record_outcome(CacheOperation::Decrement, &outcome.result, CacheActivity::Counted, outcome.duration);
        outcome.result
    }
}
