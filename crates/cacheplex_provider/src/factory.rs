// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Validated construction of providers from options.

use crate::{Error, Result};

/// Builds providers of one type from options of one type.
///
/// Factories validate options before constructing anything: missing identity settings fail
/// with `InvalidConfiguration`, and factories bound to a live backend handle reject options
/// that name a different backend with `ConfigurationMismatch`. Creating a provider performs
/// no cache operations.
pub trait ProviderFactory: Send + Sync {
    /// The provider this factory builds.
    type Provider;

    /// The options this factory consumes.
    type Options;

    /// Builds a provider from `options`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` or `ConfigurationMismatch` for bad options, or a backend
    /// error when the backend handle could not be opened.
    fn create(&self, options: Self::Options) -> Result<Self::Provider>;
}

/// Checks that the identity declared by options matches the bound backend handle.
///
/// # Errors
///
/// Returns `ConfigurationMismatch` when `declared` differs from `bound`.
///
/// # Examples
///
/// ```
/// use cacheplex_provider::factory::ensure_identity;
///
/// assert!(ensure_identity("orders", "orders").is_ok());
/// assert!(ensure_identity("orders", "invoices").is_err());
/// ```
pub fn ensure_identity(bound: &str, declared: &str) -> Result<()> {
    if bound == declared {
        Ok(())
    } else {
        Err(Error::configuration_mismatch(bound, declared))
    }
}
