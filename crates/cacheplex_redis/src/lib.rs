// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Remote key-value cache provider.
//!
//! This crate provides [`RedisCacheProvider`], a [`CacheProvider`][cacheplex_provider::CacheProvider]
//! that stores values as JSON text in a remote key-value server. The provider talks to the
//! server through the [`KeyValueClient`] trait; enable the `redis` feature for
//! [`RedisClient`], an implementation over the `redis` crate's connection manager.
//!
//! Beyond the cache contract the provider exposes the server's native conveniences:
//! conditional writes, atomic counters, expiration management, lists and hashes.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use cacheplex_provider::{CacheProvider, Expiration, ProviderFactory};
//! use cacheplex_redis::{RedisClient, RedisProviderFactory, RedisProviderOptions};
//! use tick::Clock;
//!
//! let client = Arc::new(RedisClient::connect("redis://127.0.0.1:6379").await?);
//! let factory = RedisProviderFactory::new(client, Clock::new_tokio());
//! let provider = factory.create(RedisProviderOptions::new("127.0.0.1:6379").key_prefix("orders:"))?;
//!
//! provider.set("42", &"pending".to_string(), Expiration::never()).await?;
//! let hits = provider.increment("hits", 1).await?;
//! ```

mod client;
#[cfg(feature = "redis")]
mod connection;
mod factory;
mod options;
mod provider;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use client::KeyValueClient;
#[cfg(feature = "redis")]
#[doc(inline)]
pub use connection::RedisClient;
#[doc(inline)]
pub use factory::RedisProviderFactory;
#[doc(inline)]
pub use options::RedisProviderOptions;
#[doc(inline)]
pub use provider::RedisCacheProvider;
