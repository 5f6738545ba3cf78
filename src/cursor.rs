//! Incremental-sync cursor computation
//!
//! After a full fetch, the next run's time window is derived from the
//! maximum event creation time actually observed. The resulting
//! [`CursorResult`] is the only state persisted across runs.

use serde::{Deserialize, Serialize};

/// Configured time bounds for a run, in epoch seconds. Read-only input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    /// Inclusive lower bound on event creation time
    pub start_time: Option<i64>,
    /// Inclusive upper bound on event creation time
    pub end_time: Option<i64>,
}

/// Bounds of the next run, written once at the end of a successful fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorResult {
    /// Next run's start time, epoch seconds. Always >= 1 once computed.
    pub start_time: i64,
    /// Next run's end time, present only when an end time was configured
    pub end_time: Option<i64>,
}

/// Compute the next run's window from the maximum observed event creation
/// time (`0` when no events were observed).
///
/// Returns `None` when incremental mode is off: nothing is persisted.
/// With no observed events the next start is `now` so an empty window is
/// not re-scanned. Otherwise the next start is `max_observed + 1`, clamped
/// to `end_time + 1` when an end time is configured (the end time may lie
/// in the future).
///
/// When an end time is configured the window slides forward keeping its
/// configured length: `next_end = next_start + (end_time - start_time)`.
pub fn plan_next_window(
    incremental: bool,
    window: TimeWindow,
    max_observed: i64,
    now: i64,
) -> Option<CursorResult> {
    if !incremental {
        return None;
    }

    let start_time = if max_observed == 0 {
        now
    } else {
        match window.end_time {
            Some(end) => i64::min(end + 1, max_observed + 1),
            None => max_observed + 1,
        }
    };

    let end_time = window.end_time.map(|end| {
        let length = (end - window.start_time.unwrap_or(0)).max(0);
        start_time + length
    });

    Some(CursorResult {
        start_time,
        end_time,
    })
}
