// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use tick::Clock;

/// Result of a timed async operation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TimedResult<R> {
    pub result: R,
    pub duration: Duration,
}

/// Awaits `f` and measures how long it took on `clock`.
pub(crate) async fn timed<F: Future>(clock: &Clock, f: F) -> TimedResult<F::Output> {
    let start = clock.instant();
    let result = f.await;
    TimedResult {
        result,
        duration: clock.instant().saturating_duration_since(start),
    }
}
