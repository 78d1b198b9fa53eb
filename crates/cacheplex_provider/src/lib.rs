// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Backend-agnostic cache provider contract.
//!
//! This crate defines the [`CacheProvider`] trait that every cacheplex backend satisfies,
//! the opt-in [`LockingProvider`] extension for backends with pessimistic locks and atomic
//! counters, the [`ProviderFactory`] construction contract and the shared [`Error`] type.
//!
//! # Implementing a Provider
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::RwLock;
//!
//! use cacheplex_provider::{CacheProvider, CacheValue, Expiration, Result, codec, validate};
//!
//! #[derive(Default)]
//! struct SimpleProvider(RwLock<HashMap<String, String>>);
//!
//! impl CacheProvider for SimpleProvider {
//!     async fn get<T: CacheValue>(&self, key: &str) -> Result<Option<T>> {
//!         validate::key(key)?;
//!         let text = self.0.read().unwrap().get(key).cloned();
//!         text.map(|text| codec::decode(key, &text)).transpose()
//!     }
//!
//!     async fn set<T: CacheValue>(&self, key: &str, value: &T, _expiration: Expiration) -> Result<()> {
//!         validate::key(key)?;
//!         let text = codec::encode(value)?;
//!         self.0.write().unwrap().insert(key.to_string(), text);
//!         Ok(())
//!     }
//!
//!     async fn remove(&self, key: &str) -> Result<bool> {
//!         validate::key(key)?;
//!         Ok(self.0.write().unwrap().remove(key).is_some())
//!     }
//!
//!     async fn contains_key(&self, key: &str) -> Result<bool> {
//!         validate::key(key)?;
//!         Ok(self.0.read().unwrap().contains_key(key))
//!     }
//! }
//! ```

pub mod codec;
pub mod error;
mod expiration;
pub mod factory;
mod lock;
mod provider;
#[cfg(any(feature = "test-util", test))]
pub mod testing;
pub mod validate;

#[doc(inline)]
pub use error::{BoxError, Error, ErrorKind, Result};
#[doc(inline)]
pub use expiration::Expiration;
#[doc(inline)]
pub use factory::ProviderFactory;
pub use ohno::ErrorExt;
#[doc(inline)]
pub use lock::{DEFAULT_LOCK_WAIT, LockHandle, LockRelease, LockToken, LockingProvider};
#[doc(inline)]
pub use provider::{CacheProvider, CacheValue};
