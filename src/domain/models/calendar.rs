//! UTC calendar truncation helpers shared by recurrence matching and
//! leaderboard windows.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};

pub fn start_of_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive()
        .and_hms_opt(at.hour(), at.minute(), 0)
        .map_or(at, |naive| naive.and_utc())
}

pub fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive()
        .and_hms_opt(0, 0, 0)
        .map_or(at, |naive| naive.and_utc())
}

pub fn start_of_month(at: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(at.year(), at.month(), 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map_or(at, |naive| naive.and_utc())
}
