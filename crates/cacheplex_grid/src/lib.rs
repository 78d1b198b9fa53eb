// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Distributed cache grid provider.
//!
//! This crate provides [`GridCacheProvider`], which implements both
//! [`CacheProvider`][cacheplex_provider::CacheProvider] and
//! [`LockingProvider`][cacheplex_provider::LockingProvider] over one named cache of a
//! distributed grid. The grid is reached through two traits:
//!
//! - [`GridConnector`] opens named caches with [`ConnectionSettings`];
//! - [`GridClient`] is an opened cache with values, pessimistic locks and counters.
//!
//! The grid is the only arbiter of lock exclusivity and counter atomicity; the provider adds
//! validation, JSON encoding, expiration normalization, the seeded counter protocol and
//! error mapping.
//!
//! # Counters
//!
//! `increment(key, seed, delta)` first tries an insert-if-absent of `seed + delta`; if the
//! key already exists (or another client won the race) it applies an atomic increment of
//! `delta`. Readers therefore never see the bare seed.
//!
//! # Lock Handles
//!
//! Lock handles are released with [`LockHandle::release`][cacheplex_provider::LockHandle::release].
//! A handle dropped without release is released in the background on the provider's
//! [`anyspawn::Spawner`]; if that fails too the grid lets the lease lapse.

mod client;
mod factory;
mod options;
mod provider;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use client::{GridClient, GridConnector};
#[doc(inline)]
pub use factory::GridProviderFactory;
#[doc(inline)]
pub use options::{ConnectionSettings, DEFAULT_LOCK_LEASE, GridProviderOptions};
#[doc(inline)]
pub use provider::GridCacheProvider;
