// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Document store provider.

use std::fmt::{self, Display};
use std::sync::Arc;

use cacheplex_provider::{BoxError, CacheProvider, CacheValue, Error, Expiration, Result, codec, validate};
use tick::Clock;

use crate::{DocumentBucket, DocumentCollection, QueryStatus};

/// A cache provider storing values as JSON documents in one collection of a bucket.
///
/// Providers start on the bucket's default collection; [`collection`][Self::collection]
/// returns a provider scoped to a named collection of the same bucket.
pub struct DocumentCacheProvider<B: DocumentBucket> {
    bucket: Arc<B>,
    collection: Arc<B::Collection>,
    clock: Clock,
}

impl<B: DocumentBucket> Clone for DocumentCacheProvider<B> {
    fn clone(&self) -> Self {
        Self {
            bucket: Arc::clone(&self.bucket),
            collection: Arc::clone(&self.collection),
            clock: self.clock.clone(),
        }
    }
}

impl<B: DocumentBucket> fmt::Debug for DocumentCacheProvider<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCacheProvider")
            .field("bucket", &self.bucket.name())
            .finish_non_exhaustive()
    }
}

fn backend(action: impl Display, error: BoxError) -> Error {
    tracing::debug!(cache.action = %action, error = %error, "document store call failed");
    Error::backend(action.to_string(), error)
}

impl<B: DocumentBucket> DocumentCacheProvider<B> {
    /// Creates a provider on the default collection of `bucket`.
    #[must_use]
    pub fn new(bucket: Arc<B>, clock: Clock) -> Self {
        let collection = Arc::new(bucket.default_collection());
        Self { bucket, collection, clock }
    }

    /// Returns the name of the bucket.
    #[must_use]
    pub fn bucket_name(&self) -> &str {
        self.bucket.name()
    }

    /// Returns the collection this provider reads and writes.
    #[must_use]
    pub fn raw_collection(&self) -> &B::Collection {
        &self.collection
    }

    /// Returns a provider on the bucket's default collection.
    #[must_use]
    pub fn default_collection(&self) -> Self {
        Self::new(Arc::clone(&self.bucket), self.clock.clone())
    }

    /// Returns a provider on `collection` in `scope` of the same bucket.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for a blank scope or collection name, or a backend error when
    /// the collection cannot be opened.
    pub async fn collection(&self, scope: &str, collection: &str) -> Result<Self> {
        validate::identifier("scope_name", scope)?;
        validate::identifier("collection_name", collection)?;

        let opened = self
            .bucket
            .collection(scope, collection)
            .await
            .map_err(|e| backend(format_args!("getting collection '{collection}' in scope '{scope}'"), e))?;

        Ok(Self {
            bucket: Arc::clone(&self.bucket),
            collection: Arc::new(opened),
            clock: self.clock.clone(),
        })
    }

    /// Drops the index `index_name` on the bucket.
    ///
    /// Returns whether the query service reported success.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for a blank index name, or a backend error when the statement
    /// could not be submitted.
    pub async fn drop_index(&self, index_name: &str) -> Result<bool> {
        validate::identifier("index_name", index_name)?;

        let statement = format!("DROP INDEX `{}`.`{index_name}`", self.bucket.name());
        let status = self
            .bucket
            .query(&statement)
            .await
            .map_err(|e| backend(format_args!("dropping index '{index_name}'"), e))?;

        if status != QueryStatus::Success {
            tracing::debug!(cache.index = index_name, status = ?status, "index was not dropped");
        }
        Ok(status == QueryStatus::Success)
    }
}

impl<B: DocumentBucket> CacheProvider for DocumentCacheProvider<B> {
    async fn get<T: CacheValue>(&self, key: &str) -> Result<Option<T>> {
        validate::key(key)?;

        let json = self
            .collection
            .get(key)
            .await
            .map_err(|e| backend(format_args!("getting value for key '{key}'"), e))?;

        json.map(|json| codec::decode(key, &json)).transpose()
    }

    async fn set<T: CacheValue>(&self, key: &str, value: &T, expiration: Expiration) -> Result<()> {
        validate::key(key)?;
        let json = codec::encode(value)?;
        let expiry = expiration.normalize(self.clock.system_time())?;

        self.collection
            .upsert(key, &json, expiry)
            .await
            .map_err(|e| backend(format_args!("setting value for key '{key}'"), e))
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        validate::key(key)?;

        self.collection
            .remove(key)
            .await
            .map_err(|e| backend(format_args!("removing value for key '{key}'"), e))
    }

    async fn contains_key(&self, key: &str) -> Result<bool> {
        validate::key(key)?;

        self.collection
            .exists(key)
            .await
            .map_err(|e| backend(format_args!("checking existence of key '{key}'"), e))
    }
}
