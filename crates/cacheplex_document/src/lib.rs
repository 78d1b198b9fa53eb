// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Document store cache provider.
//!
//! This crate provides [`DocumentCacheProvider`], a [`CacheProvider`][cacheplex_provider::CacheProvider]
//! that stores each value as a JSON document in a bucket collection. The store is reached
//! through the [`DocumentBucket`] and [`DocumentCollection`] traits.
//!
//! Beyond the cache contract the provider can switch to a named collection
//! ([`DocumentCacheProvider::collection`]) and drop indexes on its bucket
//! ([`DocumentCacheProvider::drop_index`]).
//!
//! [`DocumentProviderFactory`] is bound to one open bucket and checks that options name
//! that bucket before building a provider.

mod bucket;
mod factory;
mod options;
mod provider;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use bucket::{DocumentBucket, DocumentCollection, QueryStatus};
#[doc(inline)]
pub use factory::DocumentProviderFactory;
#[doc(inline)]
pub use options::DocumentProviderOptions;
#[doc(inline)]
pub use provider::DocumentCacheProvider;
