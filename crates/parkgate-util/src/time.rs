//! Time utilities for parkgate
//!
//! All duration math happens on UTC instants so daylight-saving shifts in
//! the facility's local zone never skew a billed interval.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `PARKGATE_MOCK_TIME` environment variable can be set
//! to override the system clock. The mock clock advances from the given
//! instant at real speed.
//!
//! Format: `YYYY-MM-DD HH:MM:SS`, interpreted as UTC (e.g. `2025-12-25 14:30:00`)
//!
//! Example:
//! ```bash
//! PARKGATE_MOCK_TIME="2025-12-25 14:30:00" parkgate enter MH12AB1234 -c four-wheeler
//! ```

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::sync::OnceLock;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "PARKGATE_MOCK_TIME";

static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Utc::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match NaiveDateTime::parse_from_str(&mock_time_str, "%Y-%m-%d %H:%M:%S") {
                    Ok(naive_dt) => {
                        let mock_dt = Utc.from_utc_datetime(&naive_dt);
                        let offset = mock_dt.signed_duration_since(Utc::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    Err(_) => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = "%Y-%m-%d %H:%M:%S",
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current UTC time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Utc> {
    let real_now = Utc::now();

    if let Some(offset) = get_mock_time_offset() {
        real_now + offset
    } else {
        real_now
    }
}

/// Whole minutes from `start` to `end`, truncated. Negative when `end < start`.
pub fn minutes_between(end: DateTime<Utc>, start: DateTime<Utc>) -> i64 {
    end.signed_duration_since(start).num_minutes()
}

/// Hours needed to cover `minutes`; any partial hour counts as a full one.
pub fn ceil_hours(minutes: u64) -> u64 {
    minutes.div_ceil(60)
}

/// Advance an instant by one calendar month.
///
/// Days past the end of the target month clamp to its last day
/// (Jan 31 -> Feb 28/29). Returns `None` only when the result would be out
/// of chrono's representable range.
pub fn add_calendar_month(dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
    dt.checked_add_months(Months::new(1))
}

/// Half-open `[start, end)` UTC bounds of a calendar day.
pub fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&day.and_time(chrono::NaiveTime::MIN));
    (start, start + chrono::Duration::days(1))
}

/// Format an instant for operator-facing output.
pub fn format_datetime_full(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
