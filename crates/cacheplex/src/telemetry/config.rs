// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Telemetry configuration for instrumented providers.

use opentelemetry::metrics::Meter;
#[cfg(any(feature = "metrics", test))]
use opentelemetry::metrics::MeterProvider;
use tick::Clock;

use crate::telemetry::CacheTelemetry;

/// Configuration for provider telemetry.
///
/// Everything is disabled by default. Enable logs and/or metrics with the builder
/// methods, then hand the configuration to [`Instrumented::new`][crate::Instrumented::new].
///
/// # Examples
///
/// ```ignore
/// use cacheplex::TelemetryConfig;
///
/// // Logs only
/// let config = TelemetryConfig::new().with_logs();
///
/// // Logs and metrics
/// let config = TelemetryConfig::new().with_logs().with_metrics(&meter_provider);
/// ```
#[derive(Clone, Debug, Default)]
pub struct TelemetryConfig {
    logs_enabled: bool,
    meter: Option<Meter>,
}

impl TelemetryConfig {
    /// Creates a configuration with everything disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables structured `cache.event` logs through `tracing`.
    #[cfg(any(feature = "logs", test))]
    #[must_use]
    pub fn with_logs(self) -> Self {
        Self {
            logs_enabled: true,
            ..self
        }
    }

    /// Enables metrics recorded on a meter from `provider`.
    #[cfg(any(feature = "metrics", test))]
    #[must_use]
    pub fn with_metrics(mut self, provider: &dyn MeterProvider) -> Self {
        self.meter = Some(crate::telemetry::metrics::create_meter(provider));
        self
    }

    pub(crate) fn build(&self, clock: Clock) -> CacheTelemetry {
        CacheTelemetry::new(self.logs_enabled, self.meter.as_ref(), clock)
    }
}
