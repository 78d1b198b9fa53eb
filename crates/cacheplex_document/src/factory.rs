// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Factory for document store providers.

use std::sync::Arc;

use cacheplex_provider::factory::ensure_identity;
use cacheplex_provider::{ProviderFactory, Result, validate};
use tick::Clock;

use crate::{DocumentBucket, DocumentCacheProvider, DocumentProviderOptions};

/// Builds [`DocumentCacheProvider`]s over one already-opened bucket.
///
/// Options must name the bound bucket; options naming another bucket fail with
/// `ConfigurationMismatch` and nothing is constructed.
#[derive(Debug)]
pub struct DocumentProviderFactory<B> {
    bucket: Arc<B>,
    clock: Clock,
}

impl<B> Clone for DocumentProviderFactory<B> {
    fn clone(&self) -> Self {
        Self {
            bucket: Arc::clone(&self.bucket),
            clock: self.clock.clone(),
        }
    }
}

impl<B: DocumentBucket> DocumentProviderFactory<B> {
    /// Creates a factory bound to `bucket`.
    #[must_use]
    pub fn new(bucket: Arc<B>, clock: Clock) -> Self {
        Self { bucket, clock }
    }
}

impl<B: DocumentBucket> ProviderFactory for DocumentProviderFactory<B> {
    type Provider = DocumentCacheProvider<B>;
    type Options = DocumentProviderOptions;

    fn create(&self, options: DocumentProviderOptions) -> Result<DocumentCacheProvider<B>> {
        let bucket_name = validate::required_option("bucket_name", options.bucket_name.as_deref())?;
        ensure_identity(self.bucket.name(), bucket_name)?;

        Ok(DocumentCacheProvider::new(Arc::clone(&self.bucket), self.clock.clone()))
    }
}
