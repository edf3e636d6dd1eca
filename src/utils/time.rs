use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Whether `timestamp` lies within `max_age_secs` of `now`, in either
/// direction.
pub fn within_window(timestamp: i64, now: i64, max_age_secs: u64) -> bool {
    let max_age = i64::try_from(max_age_secs).unwrap_or(i64::MAX);
    now.saturating_sub(timestamp).saturating_abs() <= max_age
}
