use chrono::{DateTime, NaiveDate, Utc};

const MILLIS_PER_DAY: i64 = 86_400_000;

pub fn format_date_to_iso_date_only(instant: &DateTime<Utc>) -> String {
    instant.date_naive().format("%Y-%m-%d").to_string()
}

/// Whole days between two instants, rounded up: `ceil(|b - a| / 1 day)`.
pub fn days_difference(a: &DateTime<Utc>, b: &DateTime<Utc>) -> i64 {
    let millis = (*b - *a).num_milliseconds().abs();
    (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

pub fn days_between_dates(a: NaiveDate, b: NaiveDate) -> i64 {
    days_difference(&midnight_utc(a), &midnight_utc(b))
}

pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}
