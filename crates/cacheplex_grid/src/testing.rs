// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-process grid for testing.
//!
//! This module provides `FakeGrid`, a [`GridClient`] with lock leases, waiting lock requests
//! and counters, and `FakeGridConnector`, a [`GridConnector`] handing out fake caches by
//! name. Both record every call and support failure injection.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use cacheplex_provider::{BoxError, LockToken};
use parking_lot::Mutex;
use tick::{Clock, FutureExt as _};
use tokio::sync::Notify;

use crate::{ConnectionSettings, GridClient, GridConnector};

/// Recorded grid call with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridCall {
    /// `get` was called with the given key.
    Get(String),
    /// `insert` was called.
    Insert {
        /// The key written.
        key: String,
        /// The text written.
        value: String,
        /// The requested time-to-live.
        ttl: Option<Duration>,
    },
    /// `add` was called.
    Add {
        /// The key written.
        key: String,
        /// The text written.
        value: String,
        /// The requested time-to-live.
        ttl: Option<Duration>,
    },
    /// `remove` was called with the given key.
    Remove(String),
    /// `contains` was called with the given key.
    Contains(String),
    /// `lock` was called.
    Lock {
        /// The key to lock.
        key: String,
        /// How long the request was willing to wait.
        wait: Duration,
    },
    /// `unlock` was called.
    Unlock {
        /// The key to unlock.
        key: String,
        /// The token presented.
        token: LockToken,
    },
    /// `force_unlock` was called with the given key.
    ForceUnlock(String),
    /// `increment_by` was called.
    IncrementBy {
        /// The counter key.
        key: String,
        /// The amount added.
        delta: i64,
    },
}

type FailPredicate = Box<dyn Fn(&GridCall) -> bool + Send + Sync>;

#[derive(Debug, Clone)]
struct Item {
    value: String,
    expires_at: Option<Instant>,
}

#[derive(Debug, Clone)]
struct Lease {
    token: LockToken,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Tables {
    items: HashMap<String, Item>,
    leases: HashMap<String, Lease>,
}

impl Tables {
    fn purge(&mut self, now: Instant) {
        self.items.retain(|_, item| item.expires_at.is_none_or(|at| at > now));
        self.leases.retain(|_, lease| lease.expires_at > now);
    }
}

struct State {
    name: String,
    clock: Clock,
    tables: Mutex<Tables>,
    released: Notify,
    calls: Mutex<Vec<GridCall>>,
    fail_when: Mutex<Option<FailPredicate>>,
    next_token: AtomicU64,
}

/// An in-process named cache implementing [`GridClient`].
///
/// Clones share the same cache, so several providers built over clones contend for the same
/// locks like clients of one real grid. Lock leases, lock waits and value expirations follow
/// the supplied clock: use `Clock::new_tokio()` for real waiting or a `tick::ClockControl`
/// to move time by hand.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use anyspawn::Spawner;
/// use cacheplex_grid::GridCacheProvider;
/// use cacheplex_grid::testing::FakeGrid;
/// use cacheplex_provider::{CacheProvider, Expiration, LockingProvider};
/// use tick::Clock;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let clock = Clock::new_tokio();
/// let grid = FakeGrid::new("orders", clock.clone());
/// let provider = GridCacheProvider::new(Arc::new(grid.clone()), clock, Spawner::new_tokio());
///
/// let lock = provider.acquire_lock("order:1", None).await.unwrap();
/// assert!(grid.is_locked("order:1"));
/// provider.set("order:1", &"paid".to_string(), Expiration::never()).await.unwrap();
/// lock.release().await.unwrap();
///
/// assert_eq!(provider.increment("visits", 10, 5).await.unwrap(), 15);
/// assert!(provider.acquire_lock("visits", Some(Duration::ZERO)).await.is_ok());
/// # }
/// ```
#[derive(Clone)]
pub struct FakeGrid {
    state: Arc<State>,
}

impl std::fmt::Debug for FakeGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeGrid")
            .field("name", &self.state.name)
            .field("tables", &self.state.tables)
            .field("calls", &self.state.calls)
            .field("fail_when", &self.state.fail_when.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl FakeGrid {
    /// Creates an empty cache named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, clock: Clock) -> Self {
        Self {
            state: Arc::new(State {
                name: name.into(),
                clock,
                tables: Mutex::new(Tables::default()),
                released: Notify::new(),
                calls: Mutex::new(Vec::new()),
                fail_when: Mutex::new(None),
                next_token: AtomicU64::new(1),
            }),
        }
    }

    /// Returns the raw text stored under `key`, ignoring expiration.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.state.tables.lock().items.get(key).map(|item| item.value.clone())
    }

    /// Returns whether `key` is under an unexpired lock.
    #[must_use]
    pub fn is_locked(&self, key: &str) -> bool {
        let now = self.state.clock.instant();
        self.state.tables.lock().leases.get(key).is_some_and(|lease| lease.expires_at > now)
    }

    /// Drops `key` as the grid would on eviction, without recording a call.
    pub fn evict(&self, key: &str) -> bool {
        self.state.tables.lock().items.remove(key).is_some()
    }

    /// Sets a predicate that determines which calls fail.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&GridCall) -> bool + Send + Sync + 'static,
    {
        *self.state.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all calls to succeed.
    pub fn clear_failures(&self) {
        *self.state.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<GridCall> {
        self.state.calls.lock().clone()
    }

    /// Clears all recorded calls.
    pub fn clear_calls(&self) {
        self.state.calls.lock().clear();
    }

    fn record(&self, call: GridCall) -> Result<(), BoxError> {
        let fail = self
            .state
            .fail_when
            .lock()
            .as_ref()
            .is_some_and(|predicate| predicate(&call));
        self.state.calls.lock().push(call);
        if fail {
            return Err("fake grid: operation failed".into());
        }
        Ok(())
    }

    fn with_tables<R>(&self, f: impl FnOnce(&mut Tables, Instant) -> R) -> R {
        let now = self.state.clock.instant();
        let mut tables = self.state.tables.lock();
        tables.purge(now);
        f(&mut tables, now)
    }

    fn write(&self, key: &str, value: &str, ttl: Option<Duration>, only_if_absent: bool) -> bool {
        self.with_tables(|tables, now| {
            if only_if_absent && tables.items.contains_key(key) {
                return false;
            }
            let item = Item {
                value: value.to_string(),
                expires_at: ttl.map(|ttl| now + ttl),
            };
            tables.items.insert(key.to_string(), item);
            true
        })
    }

    /// Grants the lock when free, otherwise reports how long the current lease still runs.
    fn try_lock(&self, key: &str, lease: Duration) -> Result<LockToken, Duration> {
        self.with_tables(|tables, now| {
            if let Some(current) = tables.leases.get(key) {
                return Err(current.expires_at.saturating_duration_since(now));
            }
            let id = self.state.next_token.fetch_add(1, Ordering::Relaxed);
            let token = LockToken::new(format!("{}:{id}", self.state.name));
            tables.leases.insert(
                key.to_string(),
                Lease {
                    token: token.clone(),
                    expires_at: now + lease,
                },
            );
            Ok(token)
        })
    }
}

impl GridClient for FakeGrid {
    fn cache_name(&self) -> &str {
        &self.state.name
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        self.record(GridCall::Get(key.to_string()))?;
        Ok(self.with_tables(|tables, _| tables.items.get(key).map(|item| item.value.clone())))
    }

    async fn insert(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), BoxError> {
        self.record(GridCall::Insert {
            key: key.to_string(),
            value: value.to_string(),
            ttl,
        })?;
        self.write(key, value, ttl, false);
        Ok(())
    }

    async fn add(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool, BoxError> {
        self.record(GridCall::Add {
            key: key.to_string(),
            value: value.to_string(),
            ttl,
        })?;
        Ok(self.write(key, value, ttl, true))
    }

    async fn remove(&self, key: &str) -> Result<bool, BoxError> {
        self.record(GridCall::Remove(key.to_string()))?;
        Ok(self.with_tables(|tables, _| tables.items.remove(key).is_some()))
    }

    async fn contains(&self, key: &str) -> Result<bool, BoxError> {
        self.record(GridCall::Contains(key.to_string()))?;
        Ok(self.with_tables(|tables, _| tables.items.contains_key(key)))
    }

    async fn lock(&self, key: &str, wait: Duration, lease: Duration) -> Result<Option<LockToken>, BoxError> {
        self.record(GridCall::Lock {
            key: key.to_string(),
            wait,
        })?;

        let clock = &self.state.clock;
        let deadline = clock.instant().checked_add(wait);

        loop {
            // Registered before checking so a release in between is not missed.
            let released = self.state.released.notified();

            let held_for = match self.try_lock(key, lease) {
                Ok(token) => return Ok(Some(token)),
                Err(held_for) => held_for,
            };

            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(clock.instant()),
                None => held_for,
            };
            if remaining.is_zero() {
                return Ok(None);
            }

            // Wake on release, on lease expiry or at the deadline, whichever comes first.
            let _ = released.timeout(clock, remaining.min(held_for)).await;
        }
    }

    async fn unlock(&self, key: &str, token: &LockToken) -> Result<bool, BoxError> {
        self.record(GridCall::Unlock {
            key: key.to_string(),
            token: token.clone(),
        })?;

        let released = self.with_tables(|tables, _| {
            if tables.leases.get(key).is_some_and(|lease| &lease.token == token) {
                tables.leases.remove(key);
                true
            } else {
                false
            }
        });
        if released {
            self.state.released.notify_waiters();
        }
        Ok(released)
    }

    async fn force_unlock(&self, key: &str) -> Result<bool, BoxError> {
        self.record(GridCall::ForceUnlock(key.to_string()))?;

        let released = self.with_tables(|tables, _| tables.leases.remove(key).is_some());
        if released {
            self.state.released.notify_waiters();
        }
        Ok(released)
    }

    async fn increment_by(&self, key: &str, delta: i64) -> Result<i64, BoxError> {
        self.record(GridCall::IncrementBy {
            key: key.to_string(),
            delta,
        })?;

        self.with_tables(|tables, _| -> Result<i64, BoxError> {
            let item = tables.items.get_mut(key).ok_or("counter does not exist")?;
            let current: i64 = item.value.parse().map_err(|_| "value is not a counter")?;
            let next = current.checked_add(delta).ok_or("counter overflow")?;
            item.value = next.to_string();
            Ok(next)
        })
    }
}

/// A [`GridConnector`] that opens [`FakeGrid`] caches registered by name.
///
/// Every connection attempt is recorded with its settings. Connecting to an unknown cache
/// fails like a grid reporting a missing cache.
#[derive(Debug, Default)]
pub struct FakeGridConnector {
    caches: Mutex<HashMap<String, FakeGrid>>,
    connections: Mutex<Vec<(String, ConnectionSettings)>>,
}

impl FakeGridConnector {
    /// Creates a connector with no caches.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `grid` under its cache name and returns the connector.
    #[must_use]
    pub fn with_cache(self, grid: FakeGrid) -> Self {
        self.caches.lock().insert(grid.cache_name().to_string(), grid);
        self
    }

    /// Returns every connection attempt as `(cache name, settings)`.
    #[must_use]
    pub fn connections(&self) -> Vec<(String, ConnectionSettings)> {
        self.connections.lock().clone()
    }
}

impl GridConnector for FakeGridConnector {
    type Client = FakeGrid;

    fn connect(&self, cache_name: &str, settings: &ConnectionSettings) -> Result<FakeGrid, BoxError> {
        self.connections.lock().push((cache_name.to_string(), settings.clone()));

        self.caches
            .lock()
            .get(cache_name)
            .cloned()
            .ok_or_else(|| format!("cache '{cache_name}' does not exist").into())
    }
}
