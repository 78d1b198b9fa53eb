// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Options for in-memory providers.
//!
//! Every setting is optional; default options describe an unbounded table with no
//! table-wide expiration. Options can be built in code or loaded from configuration.

use std::time::Duration;

use cacheplex_provider::{Error, Result};
use serde::Deserialize;

/// moka refuses table-wide expirations longer than this.
const MAX_EXPIRATION: Duration = Duration::from_secs(1000 * 365 * 24 * 60 * 60);

/// Options for a [`MemoryCacheProvider`][crate::MemoryCacheProvider].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use cacheplex_memory::MemoryProviderOptions;
///
/// let options = MemoryProviderOptions::new()
///     .max_capacity(10_000)
///     .time_to_live(Duration::from_secs(300))
///     .time_to_idle(Duration::from_secs(60))
///     .initial_capacity(100)
///     .name("sessions");
/// ```
///
/// Loading from configuration:
///
/// ```
/// use cacheplex_memory::MemoryProviderOptions;
///
/// let options: MemoryProviderOptions = serde_json::from_str(r#"{ "max_capacity": 500, "name": "users" }"#).unwrap();
/// assert_eq!(options.max_capacity_value(), Some(500));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemoryProviderOptions {
    pub(crate) max_capacity: Option<u64>,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) time_to_live: Option<Duration>,
    pub(crate) time_to_idle: Option<Duration>,
    pub(crate) name: Option<String>,
}

impl MemoryProviderOptions {
    /// Creates options for an unbounded table without table-wide expiration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of entries.
    ///
    /// Once reached, entries are evicted using moka's `TinyLFU` policy.
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Sets the pre-allocation hint for the table.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Sets a time-to-live applied to every entry.
    ///
    /// Per-entry expirations passed to `set` still apply; whichever comes first wins.
    #[must_use]
    pub fn time_to_live(mut self, duration: Duration) -> Self {
        self.time_to_live = Some(duration);
        self
    }

    /// Sets a time-to-idle applied to every entry.
    ///
    /// The idle timer resets on every read or write of the entry.
    #[must_use]
    pub fn time_to_idle(mut self, duration: Duration) -> Self {
        self.time_to_idle = Some(duration);
        self
    }

    /// Sets a name for the table, used in logs.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the configured maximum capacity.
    #[must_use]
    pub fn max_capacity_value(&self) -> Option<u64> {
        self.max_capacity
    }

    /// Returns the configured table name.
    #[must_use]
    pub fn name_value(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Checks that the options can build a table.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for zero or out-of-range expirations and blank names.
    pub fn validate(&self) -> Result<()> {
        for (option, duration) in [("time_to_live", self.time_to_live), ("time_to_idle", self.time_to_idle)] {
            match duration {
                Some(d) if d.is_zero() => return Err(Error::invalid_configuration(format!("'{option}' must be greater than zero"))),
                Some(d) if d > MAX_EXPIRATION => {
                    return Err(Error::invalid_configuration(format!("'{option}' must not exceed 1000 years")));
                }
                _ => {}
            }
        }

        if self.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(Error::invalid_configuration("'name' must not be blank"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use cacheplex_provider::ErrorKind;

    use super::*;

    #[test]
    fn defaults_are_valid_and_unbounded() {
        let options = MemoryProviderOptions::default();

        assert!(options.validate().is_ok());
        assert_eq!(options.max_capacity_value(), None);
        assert_eq!(options.name_value(), None);
    }

    #[test]
    fn zero_expirations_are_rejected() {
        let err = MemoryProviderOptions::new().time_to_live(Duration::ZERO).validate().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidConfiguration { reason } if reason.contains("time_to_live")));

        let err = MemoryProviderOptions::new().time_to_idle(Duration::ZERO).validate().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidConfiguration { reason } if reason.contains("time_to_idle")));
    }

    #[test]
    fn out_of_range_expiration_is_rejected() {
        let err = MemoryProviderOptions::new()
            .time_to_live(MAX_EXPIRATION + Duration::from_secs(1))
            .validate()
            .unwrap_err();

        assert!(matches!(err.kind(), ErrorKind::InvalidConfiguration { .. }));
    }

    #[test]
    fn blank_name_is_rejected() {
        assert!(MemoryProviderOptions::new().name("  ").validate().is_err());
    }

    #[test]
    fn unknown_fields_are_rejected_when_loading() {
        let result = serde_json::from_str::<MemoryProviderOptions>(r#"{ "max_capacty": 5 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn durations_load_from_configuration() {
        let options: MemoryProviderOptions =
            serde_json::from_str(r#"{ "time_to_live": { "secs": 30, "nanos": 0 } }"#).unwrap();

        assert_eq!(options.time_to_live, Some(Duration::from_secs(30)));
    }
}
