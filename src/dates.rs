//! Calendar-day helpers. Stored dates are `YYYY-MM-DD` strings; anything that
//! does not parse is treated as absent rather than as an error.

use chrono::{Duration, NaiveDate};

pub const DAY_FORMAT: &str = "%Y-%m-%d";

pub fn parse_day(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DAY_FORMAT).ok()
}

pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Signed number of calendar days from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

pub fn add_days(day: NaiveDate, days: i64) -> NaiveDate {
    day + Duration::days(days)
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
