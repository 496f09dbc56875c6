use chrono::{DateTime, Duration, Utc};

/// Extends a subscription end by `days`. A running subscription is extended from its end,
/// an expired or missing one from `now`.
pub fn extend_from(current_end: Option<DateTime<Utc>>, now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    let base = match current_end {
        Some(end) if end > now => end,
        _ => now,
    };
    base + Duration::days(days)
}
