// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Backend-agnostic caching.
//!
//! This crate ties the cacheplex backends together:
//! - [`FactoryRegistry`] builds providers from options without callers depending on
//!   backend crates
//! - `Instrumented` (with the `logs` or `metrics` feature) adds OpenTelemetry metrics and
//!   structured logs to any provider
//! - Backends are re-exported behind the `memory`, `redis`, `grid` and `document` features
//!
//! Every provider implements [`CacheProvider`]; backends with pessimistic locks and atomic
//! counters also implement [`LockingProvider`].
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use cacheplex::{CacheProvider, Expiration, FactoryRegistry, MemoryCacheProvider, MemoryProviderFactory, MemoryProviderOptions};
//! use tick::Clock;
//! # futures::executor::block_on(async {
//!
//! let registry = FactoryRegistry::builder()
//!     .register(MemoryProviderFactory::new(Clock::new_frozen()))
//!     .build();
//!
//! let cache: MemoryCacheProvider = registry.create(MemoryProviderOptions::new().max_capacity(1_000))?;
//!
//! cache.set("greeting", &"hello".to_string(), Expiration::after(Duration::from_secs(60))).await?;
//! assert_eq!(cache.get::<String>("greeting").await?.as_deref(), Some("hello"));
//! # Ok::<(), cacheplex::Error>(())
//! # });
//! ```

#[cfg(any(feature = "logs", feature = "metrics", test))]
mod instrumented;
mod registry;
#[cfg(any(feature = "logs", feature = "metrics", test))]
mod telemetry;

#[doc(inline)]
pub use cacheplex_provider::{
    BoxError, CacheProvider, CacheValue, DEFAULT_LOCK_WAIT, Error, ErrorExt, ErrorKind, Expiration, LockHandle, LockToken, LockingProvider,
    ProviderFactory, Result,
};
#[cfg(feature = "document")]
#[doc(inline)]
pub use cacheplex_document::{DocumentBucket, DocumentCacheProvider, DocumentCollection, DocumentProviderFactory, DocumentProviderOptions};
#[cfg(feature = "grid")]
#[doc(inline)]
pub use cacheplex_grid::{ConnectionSettings, GridCacheProvider, GridClient, GridConnector, GridProviderFactory, GridProviderOptions};
#[cfg(feature = "memory")]
#[doc(inline)]
pub use cacheplex_memory::{MemoryCacheProvider, MemoryProviderFactory, MemoryProviderOptions};
#[cfg(feature = "redis")]
#[doc(inline)]
pub use cacheplex_redis::{KeyValueClient, RedisCacheProvider, RedisProviderFactory, RedisProviderOptions};
#[cfg(any(feature = "logs", feature = "metrics", test))]
#[doc(inline)]
pub use instrumented::Instrumented;
#[doc(inline)]
pub use registry::{FactoryRegistry, FactoryRegistryBuilder};
#[cfg(any(feature = "logs", feature = "metrics", test))]
#[doc(inline)]
pub use telemetry::TelemetryConfig;
