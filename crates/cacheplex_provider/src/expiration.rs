// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Expiration policy attached to stored values.

use std::time::{Duration, SystemTime};

use serde::Deserialize;

use crate::{Error, Result};

/// When a stored value should expire.
///
/// An expiration may carry a relative duration, an absolute point in time, both, or neither.
/// Backends only understand relative durations, so [`Expiration::normalize`] resolves the
/// policy against the current time: the relative duration wins when both are present, and an
/// absolute time is converted to the remaining duration.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use cacheplex_provider::Expiration;
///
/// let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
///
/// assert_eq!(Expiration::never().normalize(now).unwrap(), None);
///
/// let relative = Expiration::after(Duration::from_secs(30));
/// assert_eq!(relative.normalize(now).unwrap(), Some(Duration::from_secs(30)));
///
/// let absolute = Expiration::at(now + Duration::from_secs(60));
/// assert_eq!(absolute.normalize(now).unwrap(), Some(Duration::from_secs(60)));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct Expiration {
    #[serde(with = "option_duration_secs")]
    relative: Option<Duration>,
    #[serde(skip)]
    absolute: Option<SystemTime>,
}

impl Expiration {
    /// The value persists until removed or evicted by the backend.
    #[must_use]
    pub const fn never() -> Self {
        Self {
            relative: None,
            absolute: None,
        }
    }

    /// The value expires `duration` after it is stored.
    #[must_use]
    pub const fn after(duration: Duration) -> Self {
        Self {
            relative: Some(duration),
            absolute: None,
        }
    }

    /// The value expires at `time`.
    #[must_use]
    pub const fn at(time: SystemTime) -> Self {
        Self {
            relative: None,
            absolute: Some(time),
        }
    }

    /// Sets the relative part of the policy.
    #[must_use]
    pub const fn with_relative(mut self, duration: Duration) -> Self {
        self.relative = Some(duration);
        self
    }

    /// Sets the absolute part of the policy.
    #[must_use]
    pub const fn with_absolute(mut self, time: SystemTime) -> Self {
        self.absolute = Some(time);
        self
    }

    /// Returns the relative part of the policy.
    #[must_use]
    pub const fn relative(&self) -> Option<Duration> {
        self.relative
    }

    /// Returns the absolute part of the policy.
    #[must_use]
    pub const fn absolute(&self) -> Option<SystemTime> {
        self.absolute
    }

    /// Returns `true` when neither part is set.
    #[must_use]
    pub const fn is_never(&self) -> bool {
        self.relative.is_none() && self.absolute.is_none()
    }

    /// Resolves the policy to the time-to-live a backend should apply.
    ///
    /// Returns `Ok(None)` when the value never expires.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` for `expiration` when the relative duration is zero or the
    /// absolute time is not after `now`.
    pub fn normalize(&self, now: SystemTime) -> Result<Option<Duration>> {
        match (self.relative, self.absolute) {
            (Some(relative), _) if relative.is_zero() => Err(Error::invalid_value("expiration")),
            (Some(relative), _) => Ok(Some(relative)),
            (None, Some(absolute)) => match absolute.duration_since(now) {
                Ok(remaining) if !remaining.is_zero() => Ok(Some(remaining)),
                _ => Err(Error::invalid_value("expiration")),
            },
            (None, None) => Ok(None),
        }
    }
}

impl From<Duration> for Expiration {
    fn from(duration: Duration) -> Self {
        Self::after(duration)
    }
}

impl From<Option<Duration>> for Expiration {
    fn from(duration: Option<Duration>) -> Self {
        duration.map_or_else(Self::never, Self::after)
    }
}

mod option_duration_secs {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| {
                Duration::try_from_secs_f64(secs)
                    .map_err(|e| D::Error::custom(format_args!("invalid 'relative' of {secs} seconds: {e}")))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn now() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(10_000)
    }

    #[test]
    fn relative_wins_over_absolute() {
        let expiration = Expiration::at(now() + Duration::from_secs(600)).with_relative(Duration::from_secs(5));

        assert_eq!(expiration.normalize(now()).unwrap(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn relative_wins_even_when_absolute_is_in_the_past() {
        let expiration = Expiration::after(Duration::from_secs(5)).with_absolute(now() - Duration::from_secs(1));

        assert_eq!(expiration.normalize(now()).unwrap(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn absolute_in_the_past_is_rejected() {
        let err = Expiration::at(now() - Duration::from_secs(1)).normalize(now()).unwrap_err();

        assert_eq!(err.kind(), &ErrorKind::InvalidValue { parameter: "expiration" });
    }

    #[test]
    fn absolute_equal_to_now_is_rejected() {
        assert!(Expiration::at(now()).normalize(now()).is_err());
    }

    #[test]
    fn zero_relative_is_rejected() {
        let err = Expiration::after(Duration::ZERO).normalize(now()).unwrap_err();

        assert_eq!(err.kind(), &ErrorKind::InvalidValue { parameter: "expiration" });
    }

    #[test]
    fn conversions() {
        assert_eq!(Expiration::from(Duration::from_secs(3)), Expiration::after(Duration::from_secs(3)));
        assert_eq!(Expiration::from(None), Expiration::never());
        assert!(Expiration::default().is_never());
    }

    #[test]
    fn deserializes_relative_seconds() {
        let expiration: Expiration = serde_json::from_str(r#"{ "relative": 2.5 }"#).unwrap();

        assert_eq!(expiration.relative(), Some(Duration::from_millis(2500)));
        assert_eq!(expiration.absolute(), None);

        let never: Expiration = serde_json::from_str("{}").unwrap();
        assert!(never.is_never());
    }

    #[test]
    fn negative_relative_seconds_are_rejected() {
        let err = serde_json::from_str::<Expiration>(r#"{ "relative": -1.0 }"#).unwrap_err();

        assert!(err.to_string().contains("invalid 'relative'"), "{err}");
    }
}
