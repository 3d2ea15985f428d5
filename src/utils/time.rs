use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local, Utc};

static LAST_ID_MS: AtomicI64 = AtomicI64::new(0);

/// Creation-time identifier in epoch milliseconds.
///
/// Two ids minted within the same millisecond would collide, so the value is
/// bumped past the previous one when the clock has not moved.
pub fn time_derived_id(now: DateTime<Utc>) -> String {
    let candidate = now.timestamp_millis();
    let mut previous = LAST_ID_MS.load(Ordering::Relaxed);
    loop {
        let next = candidate.max(previous + 1);
        match LAST_ID_MS.compare_exchange_weak(previous, next, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => return next.to_string(),
            Err(actual) => previous = actual,
        }
    }
}

/// Local wall-clock stamp used in report headers, e.g. `10/16/2026, 7:25:03 AM`.
pub fn format_report_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%m/%d/%Y, %-I:%M:%S %p")
        .to_string()
}
