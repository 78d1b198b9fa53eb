// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-process cache provider backed by moka.
//!
//! This crate provides [`MemoryCacheProvider`], a concurrent in-memory implementation of
//! [`CacheProvider`][cacheplex_provider::CacheProvider] using moka's `TinyLFU` eviction.
//! Use [`MemoryProviderOptions`] to configure capacity, TTL and TTI without exposing moka
//! types, and [`MemoryProviderFactory`] to construct providers through a registry.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use cacheplex_memory::{MemoryProviderFactory, MemoryProviderOptions};
//! use cacheplex_provider::{CacheProvider, Expiration, ProviderFactory};
//! use tick::Clock;
//!
//! # futures::executor::block_on(async {
//! let provider = MemoryProviderFactory::new(Clock::new_frozen())
//!     .create(MemoryProviderOptions::new().max_capacity(1000))
//!     .unwrap();
//!
//! provider.set("key", &"value".to_string(), Expiration::after(Duration::from_secs(300))).await.unwrap();
//! assert_eq!(provider.get::<String>("key").await.unwrap().as_deref(), Some("value"));
//! assert!(provider.remove("key").await.unwrap());
//! assert!(!provider.remove("key").await.unwrap());
//! # });
//! ```

mod factory;
mod options;
mod provider;

#[doc(inline)]
pub use factory::MemoryProviderFactory;
#[doc(inline)]
pub use options::MemoryProviderOptions;
#[doc(inline)]
pub use provider::MemoryCacheProvider;
