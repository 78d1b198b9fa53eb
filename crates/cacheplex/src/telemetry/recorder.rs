// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Recording of provider operations.

use std::sync::Arc;
use std::time::Duration;

use opentelemetry::{
    KeyValue,
    logs::Severity,
    metrics::{Counter, Histogram, Meter},
};
use tick::Clock;

use crate::telemetry::metrics::{create_event_counter, create_operation_duration_histogram};
use crate::telemetry::{CacheActivity, CacheOperation, attributes};

#[derive(Debug)]
struct Inner {
    clock: Clock,
    logging_enabled: bool,
    event_counter: Option<Counter<u64>>,
    operation_duration: Option<Histogram<f64>>,
}

/// Emits metrics and logs for the operations of one provider.
#[derive(Clone, Debug)]
pub(crate) struct CacheTelemetry {
    inner: Arc<Inner>,
}

impl CacheTelemetry {
    pub fn new(logging_enabled: bool, meter: Option<&Meter>, clock: Clock) -> Self {
        Self {
            inner: Arc::new(Inner {
                clock,
                logging_enabled,
                event_counter: meter.map(create_event_counter),
                operation_duration: meter.map(create_operation_duration_histogram),
            }),
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.inner.clock
    }

    pub fn record(&self, cache_name: &'static str, operation: CacheOperation, activity: CacheActivity, duration: Duration) {
        let attrs = [
            KeyValue::new(attributes::CACHE_NAME, cache_name),
            KeyValue::new(attributes::CACHE_OPERATION_NAME, operation.as_str()),
            KeyValue::new(attributes::CACHE_ACTIVITY_NAME, activity.as_str()),
        ];

        if let Some(c) = &self.inner.event_counter {
            c.add(1, &attrs);
        }

        if let Some(h) = &self.inner.operation_duration {
            h.record(duration.as_secs_f64(), &attrs);
        }

        if self.inner.logging_enabled {
            Self::emit(cache_name, operation, activity, duration);
        }
    }

    fn emit(cache_name: &'static str, operation: CacheOperation, activity: CacheActivity, duration: Duration) {
        let op = operation.as_str();
        let ev = activity.as_str();
        let duration_ns = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);

        // Tracing levels must be constant. Field names match the constants in attributes.rs.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    cache.name = cache_name,
                    cache.operation = op,
                    cache.activity = ev,
                    cache.duration_ns = duration_ns,
                    "cache.event"
                )
            };
        }

        match activity.severity() {
            Severity::Error => emit_event!(error),
            Severity::Info => emit_event!(info),
            _ => emit_event!(debug),
        }
    }
}
