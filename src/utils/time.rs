use chrono::{Duration, NaiveDate};

/// This is the standard way of converting a date to a snapshot key in clarity.
pub fn date_to_snapshot_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn snapshot_key_to_date(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

/// Dates between start (inclusive) and end (inclusive). Empty when `start > end`.
pub fn dates_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

/// Renders a duration the way the CLI prints it, e.g. `1h5m3s`.
pub fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}

/// `mm:ss`, used by the timer readout.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
