// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-process key-value store for testing.
//!
//! This module provides `FakeKeyValueStore`, a [`KeyValueClient`] that keeps data in memory,
//! records every call and supports failure injection.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cacheplex_provider::BoxError;
use parking_lot::Mutex;
use tick::Clock;

use crate::KeyValueClient;

/// Recorded client call with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvCall {
    /// `get` was called with the given key.
    Get(String),
    /// `set` was called.
    Set {
        /// The key written.
        key: String,
        /// The text written.
        value: String,
        /// The requested time-to-live.
        ttl: Option<Duration>,
    },
    /// `set_if_absent` was called.
    SetIfAbsent {
        /// The key written.
        key: String,
        /// The text written.
        value: String,
        /// The requested time-to-live.
        ttl: Option<Duration>,
    },
    /// `delete` was called with the given key.
    Delete(String),
    /// `exists` was called with the given key.
    Exists(String),
    /// `incr_by` was called.
    IncrBy {
        /// The counter key.
        key: String,
        /// The amount added.
        delta: i64,
    },
    /// `expire` was called.
    Expire {
        /// The key.
        key: String,
        /// The new time-to-live.
        ttl: Option<Duration>,
    },
    /// `ttl` was called with the given key.
    Ttl(String),
    /// `lpush` was called.
    LPush {
        /// The list key.
        key: String,
        /// The text pushed.
        value: String,
    },
    /// `rpush` was called.
    RPush {
        /// The list key.
        key: String,
        /// The text pushed.
        value: String,
    },
    /// `lpop` was called with the given key.
    LPop(String),
    /// `rpop` was called with the given key.
    RPop(String),
    /// `llen` was called with the given key.
    LLen(String),
    /// `hset` was called.
    HSet {
        /// The hash key.
        key: String,
        /// The field written.
        field: String,
        /// The text written.
        value: String,
    },
    /// `hget` was called.
    HGet {
        /// The hash key.
        key: String,
        /// The field read.
        field: String,
    },
    /// `hdel` was called.
    HDel {
        /// The hash key.
        key: String,
        /// The field deleted.
        field: String,
    },
    /// `hexists` was called.
    HExists {
        /// The hash key.
        key: String,
        /// The field checked.
        field: String,
    },
    /// `hlen` was called with the given key.
    HLen(String),
}

type FailPredicate = Box<dyn Fn(&KvCall) -> bool + Send + Sync>;

const WRONG_TYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

#[derive(Debug, Clone)]
enum Stored {
    Text(String),
    List(VecDeque<String>),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Item {
    value: Stored,
    expires_at: Option<Instant>,
}

impl Item {
    fn text(value: &str, expires_at: Option<Instant>) -> Self {
        Self {
            value: Stored::Text(value.to_string()),
            expires_at,
        }
    }
}

/// An in-memory key-value store implementing [`KeyValueClient`].
///
/// Expirations follow the supplied clock, so tests can move time with `tick::ClockControl`.
/// Lists and hashes live beside plain values; a command against a key of another kind fails
/// with the server's `WRONGTYPE` error, and emptied lists and hashes disappear.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use cacheplex_provider::{CacheProvider, Expiration};
/// use cacheplex_redis::RedisCacheProvider;
/// use cacheplex_redis::testing::{FakeKeyValueStore, KvCall};
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let store = Arc::new(FakeKeyValueStore::new("fake:6379", Clock::new_frozen()));
/// let provider = RedisCacheProvider::new(Arc::clone(&store), Clock::new_frozen());
///
/// provider.set("k", &1, Expiration::never()).await.unwrap();
/// assert_eq!(
///     store.calls(),
///     vec![KvCall::Set { key: "k".to_string(), value: "1".to_string(), ttl: None }]
/// );
/// # });
/// ```
pub struct FakeKeyValueStore {
    endpoint: String,
    clock: Clock,
    data: Mutex<HashMap<String, Item>>,
    calls: Mutex<Vec<KvCall>>,
    fail_when: Mutex<Option<FailPredicate>>,
}

impl std::fmt::Debug for FakeKeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeKeyValueStore")
            .field("endpoint", &self.endpoint)
            .field("data", &self.data)
            .field("calls", &self.calls)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl FakeKeyValueStore {
    /// Creates an empty store that reports `endpoint` as its identity.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, clock: Clock) -> Self {
        Self {
            endpoint: endpoint.into(),
            clock,
            data: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            fail_when: Mutex::new(None),
        }
    }

    /// Creates an empty store wrapped in an [`Arc`], ready to hand to a factory.
    #[must_use]
    pub fn shared(endpoint: impl Into<String>, clock: Clock) -> Arc<Self> {
        Arc::new(Self::new(endpoint, clock))
    }

    /// Returns the raw text stored under `key`, ignoring expiration.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        match self.data.lock().get(key).map(|item| &item.value) {
            Some(Stored::Text(text)) => Some(text.clone()),
            _ => None,
        }
    }

    /// Returns the elements of the list under `key`, first to last, ignoring expiration.
    #[must_use]
    pub fn raw_list(&self, key: &str) -> Option<Vec<String>> {
        match self.data.lock().get(key).map(|item| &item.value) {
            Some(Stored::List(list)) => Some(list.iter().cloned().collect()),
            _ => None,
        }
    }

    /// Returns the raw text of `field` in the hash under `key`, ignoring expiration.
    #[must_use]
    pub fn raw_hash_field(&self, key: &str, field: &str) -> Option<String> {
        match self.data.lock().get(key).map(|item| &item.value) {
            Some(Stored::Hash(hash)) => hash.get(field).cloned(),
            _ => None,
        }
    }

    /// Sets a predicate that determines which calls fail.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&KvCall) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all calls to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<KvCall> {
        self.calls.lock().clone()
    }

    /// Clears all recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: KvCall) -> Result<(), BoxError> {
        let fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&call));
        self.calls.lock().push(call);
        if fail {
            return Err("fake: connection refused".into());
        }
        Ok(())
    }

    fn expires_at(&self, ttl: Option<Duration>) -> Option<Instant> {
        ttl.map(|ttl| self.clock.instant() + ttl)
    }

    /// Runs `f` on the live entries, dropping any that have expired first.
    fn with_live<R>(&self, f: impl FnOnce(&mut HashMap<String, Item>) -> R) -> R {
        let now = self.clock.instant();
        let mut data = self.data.lock();
        data.retain(|_, item| item.expires_at.is_none_or(|at| at > now));
        f(&mut data)
    }

    fn push(&self, key: &str, value: &str, front: bool) -> Result<u64, BoxError> {
        self.with_live(|data| -> Result<u64, BoxError> {
            let item = data.entry(key.to_string()).or_insert_with(|| Item {
                value: Stored::List(VecDeque::new()),
                expires_at: None,
            });
            let Stored::List(list) = &mut item.value else {
                return Err(WRONG_TYPE.into());
            };
            if front {
                list.push_front(value.to_string());
            } else {
                list.push_back(value.to_string());
            }
            Ok(list.len() as u64)
        })
    }

    fn pop(&self, key: &str, front: bool) -> Result<Option<String>, BoxError> {
        self.with_live(|data| -> Result<Option<String>, BoxError> {
            let Some(item) = data.get_mut(key) else {
                return Ok(None);
            };
            let Stored::List(list) = &mut item.value else {
                return Err(WRONG_TYPE.into());
            };
            let popped = if front { list.pop_front() } else { list.pop_back() };
            if list.is_empty() {
                data.remove(key);
            }
            Ok(popped)
        })
    }

    /// Runs `f` on the hash under `key`, or on an empty hash when the key is missing.
    fn read_hash<R>(&self, key: &str, f: impl FnOnce(&HashMap<String, String>) -> R) -> Result<R, BoxError> {
        self.with_live(|data| -> Result<R, BoxError> {
            match data.get(key).map(|item| &item.value) {
                None => Ok(f(&HashMap::new())),
                Some(Stored::Hash(hash)) => Ok(f(hash)),
                Some(_) => Err(WRONG_TYPE.into()),
            }
        })
    }
}

impl KeyValueClient for FakeKeyValueStore {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        self.record(KvCall::Get(key.to_string()))?;
        self.with_live(|data| -> Result<Option<String>, BoxError> {
            match data.get(key).map(|item| &item.value) {
                None => Ok(None),
                Some(Stored::Text(text)) => Ok(Some(text.clone())),
                Some(_) => Err(WRONG_TYPE.into()),
            }
        })
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), BoxError> {
        self.record(KvCall::Set {
            key: key.to_string(),
            value: value.to_string(),
            ttl,
        })?;
        let item = Item::text(value, self.expires_at(ttl));
        self.with_live(|data| data.insert(key.to_string(), item));
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool, BoxError> {
        self.record(KvCall::SetIfAbsent {
            key: key.to_string(),
            value: value.to_string(),
            ttl,
        })?;
        let item = Item::text(value, self.expires_at(ttl));
        Ok(self.with_live(|data| {
            if data.contains_key(key) {
                false
            } else {
                data.insert(key.to_string(), item);
                true
            }
        }))
    }

    async fn delete(&self, key: &str) -> Result<bool, BoxError> {
        self.record(KvCall::Delete(key.to_string()))?;
        Ok(self.with_live(|data| data.remove(key).is_some()))
    }

    async fn exists(&self, key: &str) -> Result<bool, BoxError> {
        self.record(KvCall::Exists(key.to_string()))?;
        Ok(self.with_live(|data| data.contains_key(key)))
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, BoxError> {
        self.record(KvCall::IncrBy {
            key: key.to_string(),
            delta,
        })?;
        self.with_live(|data| -> Result<i64, BoxError> {
            let item = data.entry(key.to_string()).or_insert_with(|| Item::text("0", None));
            let Stored::Text(text) = &mut item.value else {
                return Err(WRONG_TYPE.into());
            };
            let current: i64 = text.parse().map_err(|_| "value is not an integer or out of range")?;
            let next = current.checked_add(delta).ok_or("increment or decrement would overflow")?;
            *text = next.to_string();
            Ok(next)
        })
    }

    async fn expire(&self, key: &str, ttl: Option<Duration>) -> Result<bool, BoxError> {
        self.record(KvCall::Expire {
            key: key.to_string(),
            ttl,
        })?;
        let expires_at = self.expires_at(ttl);
        Ok(self.with_live(|data| {
            data.get_mut(key).map(|item| item.expires_at = expires_at).is_some()
        }))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, BoxError> {
        self.record(KvCall::Ttl(key.to_string()))?;
        let now = self.clock.instant();
        Ok(self.with_live(|data| {
            data.get(key)
                .and_then(|item| item.expires_at)
                .map(|at| at.saturating_duration_since(now))
        }))
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<u64, BoxError> {
        self.record(KvCall::LPush {
            key: key.to_string(),
            value: value.to_string(),
        })?;
        self.push(key, value, true)
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<u64, BoxError> {
        self.record(KvCall::RPush {
            key: key.to_string(),
            value: value.to_string(),
        })?;
        self.push(key, value, false)
    }

    async fn lpop(&self, key: &str) -> Result<Option<String>, BoxError> {
        self.record(KvCall::LPop(key.to_string()))?;
        self.pop(key, true)
    }

    async fn rpop(&self, key: &str) -> Result<Option<String>, BoxError> {
        self.record(KvCall::RPop(key.to_string()))?;
        self.pop(key, false)
    }

    async fn llen(&self, key: &str) -> Result<u64, BoxError> {
        self.record(KvCall::LLen(key.to_string()))?;
        self.with_live(|data| -> Result<u64, BoxError> {
            match data.get(key).map(|item| &item.value) {
                None => Ok(0),
                Some(Stored::List(list)) => Ok(list.len() as u64),
                Some(_) => Err(WRONG_TYPE.into()),
            }
        })
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool, BoxError> {
        self.record(KvCall::HSet {
            key: key.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        })?;
        self.with_live(|data| -> Result<bool, BoxError> {
            let item = data.entry(key.to_string()).or_insert_with(|| Item {
                value: Stored::Hash(HashMap::new()),
                expires_at: None,
            });
            let Stored::Hash(hash) = &mut item.value else {
                return Err(WRONG_TYPE.into());
            };
            Ok(hash.insert(field.to_string(), value.to_string()).is_none())
        })
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, BoxError> {
        self.record(KvCall::HGet {
            key: key.to_string(),
            field: field.to_string(),
        })?;
        self.read_hash(key, |hash| hash.get(field).cloned())
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<bool, BoxError> {
        self.record(KvCall::HDel {
            key: key.to_string(),
            field: field.to_string(),
        })?;
        self.with_live(|data| -> Result<bool, BoxError> {
            let Some(item) = data.get_mut(key) else {
                return Ok(false);
            };
            let Stored::Hash(hash) = &mut item.value else {
                return Err(WRONG_TYPE.into());
            };
            let deleted = hash.remove(field).is_some();
            if hash.is_empty() {
                data.remove(key);
            }
            Ok(deleted)
        })
    }

    async fn hexists(&self, key: &str, field: &str) -> Result<bool, BoxError> {
        self.record(KvCall::HExists {
            key: key.to_string(),
            field: field.to_string(),
        })?;
        self.read_hash(key, |hash| hash.contains_key(field))
    }

    async fn hlen(&self, key: &str) -> Result<u64, BoxError> {
        self.record(KvCall::HLen(key.to_string()))?;
        self.read_hash(key, |hash| hash.len() as u64)
    }
}
