//! Relative time labels for the session list.

use chrono::{DateTime, Utc};

/// Label like `Just now`, `5m ago`, `3h ago`, or the calendar date.
pub fn relative_label(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);

    if elapsed.num_seconds() < 60 {
        "Just now".to_string()
    } else if elapsed.num_minutes() < 60 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_hours() < 24 {
        format!("{}h ago", elapsed.num_hours())
    } else {
        then.format("%Y-%m-%d").to_string()
    }
}
