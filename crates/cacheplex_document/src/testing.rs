// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-process document bucket for testing.
//!
//! This module provides `FakeBucket`, a [`DocumentBucket`] that keeps documents in memory,
//! records every call and supports failure injection.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cacheplex_provider::BoxError;
use parking_lot::Mutex;
use tick::Clock;

use crate::{DocumentBucket, DocumentCollection, QueryStatus};

/// Path of the default collection.
pub const DEFAULT_COLLECTION: &str = "_default._default";

/// Recorded bucket call with full context.
///
/// Collection calls carry the `scope.collection` path they were made on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentCall {
    /// A document was read.
    Get {
        /// The collection path.
        collection: String,
        /// The document id.
        key: String,
    },
    /// A document was written.
    Upsert {
        /// The collection path.
        collection: String,
        /// The document id.
        key: String,
        /// The document body.
        json: String,
        /// The requested expiry.
        expiry: Option<Duration>,
    },
    /// A document was removed.
    Remove {
        /// The collection path.
        collection: String,
        /// The document id.
        key: String,
    },
    /// A document's existence was checked.
    Exists {
        /// The collection path.
        collection: String,
        /// The document id.
        key: String,
    },
    /// A named collection was opened.
    OpenCollection {
        /// The scope name.
        scope: String,
        /// The collection name.
        collection: String,
    },
    /// A query statement was run.
    Query(String),
}

impl DocumentCall {
    /// Returns the collection path of a document call.
    #[must_use]
    pub fn collection(&self) -> Option<&str> {
        match self {
            Self::Get { collection, .. }
            | Self::Upsert { collection, .. }
            | Self::Remove { collection, .. }
            | Self::Exists { collection, .. } => Some(collection),
            Self::OpenCollection { .. } | Self::Query(_) => None,
        }
    }
}

type FailPredicate = Box<dyn Fn(&DocumentCall) -> bool + Send + Sync>;

#[derive(Debug, Clone)]
struct Document {
    json: String,
    expires_at: Option<Instant>,
}

struct State {
    name: String,
    clock: Clock,
    collections: Mutex<HashSet<String>>,
    documents: Mutex<HashMap<(String, String), Document>>,
    query_status: Mutex<QueryStatus>,
    calls: Mutex<Vec<DocumentCall>>,
    fail_when: Mutex<Option<FailPredicate>>,
}

impl State {
    fn record(&self, call: DocumentCall) -> Result<(), BoxError> {
        let fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&call));
        self.calls.lock().push(call);
        if fail {
            return Err("fake bucket: request failed".into());
        }
        Ok(())
    }

    fn with_documents<R>(&self, f: impl FnOnce(&mut HashMap<(String, String), Document>) -> R) -> R {
        let now = self.clock.instant();
        let mut documents = self.documents.lock();
        documents.retain(|_, doc| doc.expires_at.is_none_or(|at| at > now));
        f(&mut documents)
    }
}

/// An in-memory bucket implementing [`DocumentBucket`].
///
/// The default collection always exists; named collections must be registered with
/// [`FakeBucket::with_collection`] before they can be opened. Clones share the bucket.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use cacheplex_document::DocumentCacheProvider;
/// use cacheplex_document::testing::{DocumentCall, FakeBucket};
/// use cacheplex_provider::{CacheProvider, Expiration};
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let bucket = FakeBucket::new("sessions", Clock::new_frozen());
/// let provider = DocumentCacheProvider::new(Arc::new(bucket.clone()), Clock::new_frozen());
///
/// provider.set("s1", &"ada".to_string(), Expiration::never()).await.unwrap();
/// assert_eq!(bucket.raw("_default._default", "s1").as_deref(), Some(r#""ada""#));
/// assert!(matches!(bucket.calls()[0], DocumentCall::Upsert { .. }));
/// # });
/// ```
#[derive(Clone)]
pub struct FakeBucket {
    state: Arc<State>,
}

impl std::fmt::Debug for FakeBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeBucket")
            .field("name", &self.state.name)
            .field("collections", &self.state.collections)
            .field("documents", &self.state.documents)
            .field("calls", &self.state.calls)
            .field("fail_when", &self.state.fail_when.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl FakeBucket {
    /// Creates an empty bucket named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, clock: Clock) -> Self {
        Self {
            state: Arc::new(State {
                name: name.into(),
                clock,
                collections: Mutex::new(HashSet::from([DEFAULT_COLLECTION.to_string()])),
                documents: Mutex::new(HashMap::new()),
                query_status: Mutex::new(QueryStatus::Success),
                calls: Mutex::new(Vec::new()),
                fail_when: Mutex::new(None),
            }),
        }
    }

    /// Registers `collection` in `scope` and returns the bucket.
    #[must_use]
    pub fn with_collection(self, scope: &str, collection: &str) -> Self {
        self.state.collections.lock().insert(format!("{scope}.{collection}"));
        self
    }

    /// Sets the status reported for query statements.
    pub fn set_query_status(&self, status: QueryStatus) {
        *self.state.query_status.lock() = status;
    }

    /// Returns the raw JSON of `key` in the collection at `path`, ignoring expiry.
    #[must_use]
    pub fn raw(&self, path: &str, key: &str) -> Option<String> {
        self.state
            .documents
            .lock()
            .get(&(path.to_string(), key.to_string()))
            .map(|doc| doc.json.clone())
    }

    /// Sets a predicate that determines which calls fail.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&DocumentCall) -> bool + Send + Sync + 'static,
    {
        *self.state.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all calls to succeed.
    pub fn clear_failures(&self) {
        *self.state.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<DocumentCall> {
        self.state.calls.lock().clone()
    }

    /// Clears all recorded calls.
    pub fn clear_calls(&self) {
        self.state.calls.lock().clear();
    }
}

/// A collection of a [`FakeBucket`].
#[derive(Clone)]
pub struct FakeCollection {
    state: Arc<State>,
    path: String,
}

impl std::fmt::Debug for FakeCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeCollection").field("path", &self.path).finish_non_exhaustive()
    }
}

impl FakeCollection {
    /// Returns the `scope.collection` path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    fn id(&self, key: &str) -> (String, String) {
        (self.path.clone(), key.to_string())
    }
}

impl DocumentCollection for FakeCollection {
    async fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        self.state.record(DocumentCall::Get {
            collection: self.path.clone(),
            key: key.to_string(),
        })?;
        let id = self.id(key);
        Ok(self.state.with_documents(|docs| docs.get(&id).map(|doc| doc.json.clone())))
    }

    async fn upsert(&self, key: &str, json: &str, expiry: Option<Duration>) -> Result<(), BoxError> {
        self.state.record(DocumentCall::Upsert {
            collection: self.path.clone(),
            key: key.to_string(),
            json: json.to_string(),
            expiry,
        })?;
        let doc = Document {
            json: json.to_string(),
            expires_at: expiry.map(|expiry| self.state.clock.instant() + expiry),
        };
        let id = self.id(key);
        self.state.with_documents(|docs| docs.insert(id, doc));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, BoxError> {
        self.state.record(DocumentCall::Remove {
            collection: self.path.clone(),
            key: key.to_string(),
        })?;
        let id = self.id(key);
        Ok(self.state.with_documents(|docs| docs.remove(&id).is_some()))
    }

    async fn exists(&self, key: &str) -> Result<bool, BoxError> {
        self.state.record(DocumentCall::Exists {
            collection: self.path.clone(),
            key: key.to_string(),
        })?;
        let id = self.id(key);
        Ok(self.state.with_documents(|docs| docs.contains_key(&id)))
    }
}

impl DocumentBucket for FakeBucket {
    type Collection = FakeCollection;

    fn name(&self) -> &str {
        &self.state.name
    }

    fn default_collection(&self) -> FakeCollection {
        FakeCollection {
            state: Arc::clone(&self.state),
            path: DEFAULT_COLLECTION.to_string(),
        }
    }

    async fn collection(&self, scope: &str, collection: &str) -> Result<FakeCollection, BoxError> {
        self.state.record(DocumentCall::OpenCollection {
            scope: scope.to_string(),
            collection: collection.to_string(),
        })?;

        let path = format!("{scope}.{collection}");
        if !self.state.collections.lock().contains(&path) {
            return Err(format!("collection '{path}' not found").into());
        }
        Ok(FakeCollection {
            state: Arc::clone(&self.state),
            path,
        })
    }

    async fn query(&self, statement: &str) -> Result<QueryStatus, BoxError> {
        self.state.record(DocumentCall::Query(statement.to_string()))?;
        Ok(*self.state.query_status.lock())
    }
}
