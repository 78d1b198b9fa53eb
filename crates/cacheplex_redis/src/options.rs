// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Options for remote key-value providers.

use serde::Deserialize;

/// Options for a [`RedisCacheProvider`][crate::RedisCacheProvider].
///
/// `endpoint` names the server the provider must talk to and is checked against the client
/// the factory is bound to.
///
/// # Examples
///
/// ```
/// use cacheplex_redis::RedisProviderOptions;
///
/// let options = RedisProviderOptions::new("cache-01:6379").key_prefix("orders:");
/// assert_eq!(options.endpoint_value(), Some("cache-01:6379"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedisProviderOptions {
    pub(crate) endpoint: Option<String>,
    pub(crate) key_prefix: Option<String>,
}

impl RedisProviderOptions {
    /// Creates options for the server at `endpoint`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            key_prefix: None,
        }
    }

    /// Prefixes every key written by the provider.
    #[must_use]
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Returns the configured endpoint.
    #[must_use]
    pub fn endpoint_value(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}
