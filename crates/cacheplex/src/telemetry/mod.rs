// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Provider telemetry integration with OpenTelemetry.
//!
//! Operations run through [`Instrumented`][crate::Instrumented] are recorded as an event
//! counter and a duration histogram when metrics are enabled, and as structured
//! `cache.event` logs when logs are enabled.

use cacheplex_provider::{Error, ErrorKind};
use opentelemetry::logs::Severity;

pub(crate) mod attributes;
mod config;
pub(crate) mod metrics;
mod recorder;
#[cfg(test)]
pub(crate) mod testing;
pub(crate) mod timing;

pub use config::TelemetryConfig;
pub(crate) use recorder::CacheTelemetry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheOperation {
    Get,
    Set,
    Remove,
    ContainsKey,
    AcquireLock,
    GetAndLock,
    ReleaseLock,
    Increment,
    Decrement,
}

impl CacheOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "cache.get",
            Self::Set => "cache.set",
            Self::Remove => "cache.remove",
            Self::ContainsKey => "cache.contains_key",
            Self::AcquireLock => "cache.acquire_lock",
            Self::GetAndLock => "cache.get_and_lock",
            Self::ReleaseLock => "cache.release_lock",
            Self::Increment => "cache.increment",
            Self::Decrement => "cache.decrement",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    Hit,
    Miss,
    Present,
    Absent,
    Inserted,
    Removed,
    Locked,
    Contended,
    Released,
    Counted,
    Rejected,
    Error,
}

impl CacheActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::Miss => "cache.miss",
            Self::Present => "cache.present",
            Self::Absent => "cache.absent",
            Self::Inserted => "cache.inserted",
            Self::Removed => "cache.removed",
            Self::Locked => "cache.locked",
            Self::Contended => "cache.contended",
            Self::Released => "cache.released",
            Self::Counted => "cache.counted",
            Self::Rejected => "cache.rejected",
            Self::Error => "cache.error",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Self::Hit | Self::Miss | Self::Present | Self::Absent | Self::Counted => Severity::Debug,
            Self::Inserted | Self::Removed | Self::Locked | Self::Contended | Self::Released | Self::Rejected => Severity::Info,
            Self::Error => Severity::Error,
        }
    }

    /// Classifies a failed operation.
    ///
    /// Caller mistakes and lock contention are expected outcomes; only backend failures
    /// and anything unclassified count as errors.
    pub fn failure(error: &Error) -> Self {
        match error.kind() {
            ErrorKind::LockTimeout { .. } => Self::Contended,
            ErrorKind::InvalidKey { .. } | ErrorKind::InvalidValue { .. } | ErrorKind::LockNotHeld { .. } => Self::Rejected,
            _ => Self::Error,
        }
    }
}
