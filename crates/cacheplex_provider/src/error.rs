// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

use std::fmt;
use std::time::Duration;

/// Boxed error accepted as the cause of a [`Error`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The category of a cache [`Error`].
///
/// Validation kinds (`InvalidKey`, `InvalidValue`) are raised before any backend round trip.
/// `Backend` always carries the original engine failure as its [`source`][std::error::Error::source].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A key or identifier was empty or consisted only of whitespace.
    InvalidKey {
        /// Name of the rejected parameter.
        parameter: &'static str,
    },
    /// A value was absent where a materialized value is required, or out of range.
    InvalidValue {
        /// Name of the rejected parameter.
        parameter: &'static str,
    },
    /// Provider options are missing a required setting.
    InvalidConfiguration {
        /// What is wrong with the options.
        reason: String,
    },
    /// Provider options name a different backend than the handle the factory is bound to.
    ConfigurationMismatch {
        /// Identity of the bound backend handle.
        expected: String,
        /// Identity declared by the options.
        actual: String,
    },
    /// No factory is registered for the requested provider and options pair.
    NoFactoryRegistered {
        /// Type name of the requested provider.
        provider: &'static str,
        /// Type name of the supplied options.
        options: &'static str,
    },
    /// A lock could not be acquired within the allotted wait.
    LockTimeout {
        /// The contended key.
        key: String,
        /// How long the caller waited.
        waited: Duration,
    },
    /// A release was attempted on a key not locked by the caller.
    LockNotHeld {
        /// The key that was not locked.
        key: String,
    },
    /// The backend engine failed.
    Backend {
        /// What the provider was doing when the engine failed.
        action: String,
    },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey { parameter } => write!(f, "'{parameter}' must not be empty or whitespace"),
            Self::InvalidValue { parameter } => write!(f, "'{parameter}' is not a valid value"),
            Self::InvalidConfiguration { reason } => write!(f, "invalid provider configuration: {reason}"),
            Self::ConfigurationMismatch { expected, actual } => {
                write!(f, "provider options name '{actual}' but the factory is bound to '{expected}'")
            }
            Self::NoFactoryRegistered { provider, options } => {
                write!(f, "no factory registered for provider '{provider}' with options '{options}'")
            }
            Self::LockTimeout { key, waited } => write!(f, "timed out after {waited:?} waiting for lock on key '{key}'"),
            Self::LockNotHeld { key } => write!(f, "key '{key}' is not locked by the caller"),
            Self::Backend { action } => write!(f, "error {action}"),
        }
    }
}

/// An error from a cache operation.
///
/// Inspect [`Error::kind`] to distinguish recoverable conditions (lock contention, misconfiguration)
/// from backend failures. Backend failures keep the engine's error as their source.
///
/// # Example
///
/// ```
/// use cacheplex_provider::{Error, ErrorKind};
///
/// let error = Error::invalid_key("key");
/// assert_eq!(error.kind(), &ErrorKind::InvalidKey { parameter: "key" });
/// ```
#[ohno::error]
#[display("{kind}")]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// Creates an error of the given kind without a cause.
    #[must_use]
    pub fn from_kind(kind: ErrorKind) -> Self {
        Self::new(kind)
    }

    /// Creates an `InvalidKey` error for the named parameter.
    #[must_use]
    pub fn invalid_key(parameter: &'static str) -> Self {
        Self::new(ErrorKind::InvalidKey { parameter })
    }

    /// Creates an `InvalidValue` error for the named parameter.
    #[must_use]
    pub fn invalid_value(parameter: &'static str) -> Self {
        Self::new(ErrorKind::InvalidValue { parameter })
    }

    /// Creates an `InvalidConfiguration` error.
    #[must_use]
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConfiguration { reason: reason.into() })
    }

    /// Creates a `ConfigurationMismatch` error.
    #[must_use]
    pub fn configuration_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigurationMismatch {
            expected: expected.into(),
            actual: actual.into(),
        })
    }

    /// Creates a `NoFactoryRegistered` error naming the requested types.
    #[must_use]
    pub fn no_factory_registered(provider: &'static str, options: &'static str) -> Self {
        Self::new(ErrorKind::NoFactoryRegistered { provider, options })
    }

    /// Creates a `LockTimeout` error.
    #[must_use]
    pub fn lock_timeout(key: impl Into<String>, waited: Duration) -> Self {
        Self::new(ErrorKind::LockTimeout { key: key.into(), waited })
    }

    /// Creates a `LockNotHeld` error.
    #[must_use]
    pub fn lock_not_held(key: impl Into<String>) -> Self {
        Self::new(ErrorKind::LockNotHeld { key: key.into() })
    }

    /// Wraps a backend failure with a description of the action that failed.
    ///
    /// # Examples
    ///
    /// ```
    /// use cacheplex_provider::Error;
    ///
    /// let error = Error::backend("getting value for key 'user:1'", "connection reset");
    /// assert!(error.to_string().contains("getting value for key 'user:1'"));
    /// assert!(error.to_string().contains("connection reset"));
    /// ```
    pub fn backend(action: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self::caused_by(ErrorKind::Backend { action: action.into() }, cause)
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns `true` for `InvalidKey` and `InvalidValue` errors.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self.kind, ErrorKind::InvalidKey { .. } | ErrorKind::InvalidValue { .. })
    }

    /// Returns `true` for `LockTimeout` and `LockNotHeld` errors.
    #[must_use]
    pub fn is_lock(&self) -> bool {
        matches!(self.kind, ErrorKind::LockTimeout { .. } | ErrorKind::LockNotHeld { .. })
    }

    /// Returns `true` for `Backend` errors.
    #[must_use]
    pub fn is_backend(&self) -> bool {
        matches!(self.kind, ErrorKind::Backend { .. })
    }
}

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn backend_error_keeps_cause_as_source() {
        let error = Error::backend("setting value for key 'k'", "socket closed");

        assert!(error.is_backend());
        let source = error.source().expect("backend errors carry a source");
        assert_eq!(source.to_string(), "socket closed");
    }

    #[test]
    fn display_contains_action_and_cause() {
        let error = Error::backend("removing key 'k'", "timeout");
        let display = error.to_string();

        assert!(display.contains("error removing key 'k'"), "got: {display}");
        assert!(display.contains("timeout"), "got: {display}");
    }

    #[test]
    fn validation_errors_have_no_source() {
        let error = Error::invalid_key("key");

        assert!(error.is_validation());
        assert!(!error.is_backend());
        assert!(error.source().is_none());
        assert!(error.to_string().starts_with("'key' must not be empty or whitespace"));
    }

    #[test]
    fn lock_errors_are_classified() {
        assert!(Error::lock_timeout("k", Duration::from_secs(1)).is_lock());
        assert!(Error::lock_not_held("k").is_lock());
        assert!(!Error::invalid_value("value").is_lock());
    }

    #[test]
    fn mismatch_names_both_identities() {
        let error = Error::configuration_mismatch("B1", "B2");

        assert_eq!(
            error.kind(),
            &ErrorKind::ConfigurationMismatch {
                expected: "B1".to_string(),
                actual: "B2".to_string(),
            }
        );
        assert!(error.to_string().contains("'B2'"));
        assert!(error.to_string().contains("'B1'"));
    }

    #[test]
    fn engine_failure_is_found_in_source_chain() {
        use ohno::ErrorExt;

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let error = Error::backend("getting value for key 'k'", io);

        let found = error.find_source::<std::io::Error>().expect("io error in chain");
        assert_eq!(found.kind(), std::io::ErrorKind::ConnectionReset);
        assert!(error.message().contains("getting value for key 'k'"));
    }

    #[test]
    fn result_type_alias_propagates_errors() {
        fn returns_err() -> Result<i32> {
            Err(Error::lock_not_held("k"))
        }

        let err = returns_err().expect_err("should return an error");
        assert_eq!(err.kind(), &ErrorKind::LockNotHeld { key: "k".to_string() });
    }
}
