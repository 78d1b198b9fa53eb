// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Options for grid providers.

use std::net::IpAddr;
use std::time::Duration;

use cacheplex_provider::{DEFAULT_LOCK_WAIT, Error, Result, validate};
use serde::Deserialize;

/// How long a granted lock lives when the holder never releases it.
pub const DEFAULT_LOCK_LEASE: Duration = Duration::from_secs(60);

/// Connection tuning handed to a [`GridConnector`][crate::GridConnector].
///
/// Unset values leave the grid client's own defaults in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct ConnectionSettings {
    /// Spread requests over the servers of the cluster.
    pub load_balance: bool,
    /// How long to wait for a connection to a server.
    pub connection_timeout: Option<Duration>,
    /// How many times to retry a failed connection.
    pub connection_retries: Option<u32>,
    /// Keep idle connections alive with heartbeats.
    pub enable_keep_alive: Option<bool>,
    /// Interval between keep-alive heartbeats.
    pub keep_alive_interval: Option<Duration>,
    /// How long to wait for a server to answer a request.
    pub client_request_timeout: Option<Duration>,
    /// Enable the grid client's own logs.
    pub enable_client_logs: Option<bool>,
    /// Local address the client binds to.
    pub client_bind_ip: Option<IpAddr>,
}

/// Options for a [`GridCacheProvider`][crate::GridCacheProvider].
///
/// `cache_name` selects the named cache to open and is required.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use cacheplex_grid::GridProviderOptions;
///
/// let options = GridProviderOptions::new("orders")
///     .load_balance(true)
///     .connection_timeout(Duration::from_secs(5))
///     .connection_retries(3)
///     .default_lock_wait(Duration::from_secs(2));
/// assert_eq!(options.cache_name_value(), Some("orders"));
/// ```
///
/// Loading from configuration:
///
/// ```
/// use cacheplex_grid::GridProviderOptions;
///
/// let options: GridProviderOptions = serde_json::from_str(
///     r#"{ "cache_name": "orders", "connection": { "load_balance": true, "client_bind_ip": "10.0.0.4" } }"#,
/// )
/// .unwrap();
/// assert!(options.connection_settings().load_balance);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridProviderOptions {
    pub(crate) cache_name: Option<String>,
    pub(crate) connection: ConnectionSettings,
    pub(crate) default_lock_wait: Option<Duration>,
    pub(crate) lock_lease: Option<Duration>,
}

impl GridProviderOptions {
    /// Creates options for the cache named `cache_name`.
    #[must_use]
    pub fn new(cache_name: impl Into<String>) -> Self {
        Self {
            cache_name: Some(cache_name.into()),
            ..Self::default()
        }
    }

    /// Spreads requests over the servers of the cluster.
    #[must_use]
    pub fn load_balance(mut self, enabled: bool) -> Self {
        self.connection.load_balance = enabled;
        self
    }

    /// Sets how long to wait for a connection to a server.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection.connection_timeout = Some(timeout);
        self
    }

    /// Sets how many times a failed connection is retried.
    #[must_use]
    pub fn connection_retries(mut self, retries: u32) -> Self {
        self.connection.connection_retries = Some(retries);
        self
    }

    /// Enables or disables keep-alive heartbeats.
    #[must_use]
    pub fn enable_keep_alive(mut self, enabled: bool) -> Self {
        self.connection.enable_keep_alive = Some(enabled);
        self
    }

    /// Sets the interval between keep-alive heartbeats.
    #[must_use]
    pub fn keep_alive_interval(mut self, interval: Duration) -> Self {
        self.connection.keep_alive_interval = Some(interval);
        self
    }

    /// Sets how long to wait for a server to answer a request.
    #[must_use]
    pub fn client_request_timeout(mut self, timeout: Duration) -> Self {
        self.connection.client_request_timeout = Some(timeout);
        self
    }

    /// Enables or disables the grid client's own logs.
    #[must_use]
    pub fn enable_client_logs(mut self, enabled: bool) -> Self {
        self.connection.enable_client_logs = Some(enabled);
        self
    }

    /// Binds the client to a local address.
    #[must_use]
    pub fn client_bind_ip(mut self, ip: IpAddr) -> Self {
        self.connection.client_bind_ip = Some(ip);
        self
    }

    /// Sets how long lock requests wait when the caller gives no wait.
    ///
    /// Defaults to [`DEFAULT_LOCK_WAIT`].
    #[must_use]
    pub fn default_lock_wait(mut self, wait: Duration) -> Self {
        self.default_lock_wait = Some(wait);
        self
    }

    /// Sets how long a granted lock lives when never released.
    ///
    /// Defaults to [`DEFAULT_LOCK_LEASE`].
    #[must_use]
    pub fn lock_lease(mut self, lease: Duration) -> Self {
        self.lock_lease = Some(lease);
        self
    }

    /// Returns the configured cache name.
    #[must_use]
    pub fn cache_name_value(&self) -> Option<&str> {
        self.cache_name.as_deref()
    }

    /// Returns the connection settings.
    #[must_use]
    pub fn connection_settings(&self) -> &ConnectionSettings {
        &self.connection
    }

    pub(crate) fn lock_wait_or_default(&self) -> Duration {
        self.default_lock_wait.unwrap_or(DEFAULT_LOCK_WAIT)
    }

    pub(crate) fn lock_lease_or_default(&self) -> Duration {
        self.lock_lease.unwrap_or(DEFAULT_LOCK_LEASE)
    }

    /// Checks the options and returns the cache name.
    pub(crate) fn validate(&self) -> Result<&str> {
        let cache_name = validate::required_option("cache_name", self.cache_name.as_deref())?;

        if self.lock_lease.is_some_and(|lease| lease.is_zero()) {
            return Err(Error::invalid_configuration("'lock_lease' must be greater than zero"));
        }

        if self.connection.keep_alive_interval.is_some_and(|interval| interval.is_zero()) {
            return Err(Error::invalid_configuration("'keep_alive_interval' must be greater than zero"));
        }

        Ok(cache_name)
    }
}
