// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The document store boundary.

use std::time::Duration;

use cacheplex_provider::BoxError;

/// Outcome reported by the query service for a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum QueryStatus {
    /// The statement ran to completion.
    Success,
    /// The statement ran but reported errors.
    Errors,
    /// The statement did not finish in time.
    Timeout,
    /// The statement could not run.
    Fatal,
}

/// A collection of JSON documents keyed by id.
///
/// A missing document is a normal result, never an error.
pub trait DocumentCollection: Send + Sync + 'static {
    /// Reads the document stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, BoxError>> + Send;

    /// Creates or replaces the document under `key`, expiring after `expiry` when given.
    fn upsert(&self, key: &str, json: &str, expiry: Option<Duration>) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Removes the document under `key`. Returns whether it existed.
    fn remove(&self, key: &str) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Returns whether a document exists under `key` without fetching it.
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, BoxError>> + Send;
}

/// An already-opened bucket.
pub trait DocumentBucket: Send + Sync + 'static {
    /// The bucket's collections.
    type Collection: DocumentCollection;

    /// Name of the bucket.
    fn name(&self) -> &str;

    /// Returns the bucket's default collection.
    fn default_collection(&self) -> Self::Collection;

    /// Opens `collection` in `scope`.
    fn collection(&self, scope: &str, collection: &str) -> impl Future<Output = Result<Self::Collection, BoxError>> + Send;

    /// Runs a query-service statement against the cluster holding the bucket.
    fn query(&self, statement: &str) -> impl Future<Output = Result<QueryStatus, BoxError>> + Send;
}
