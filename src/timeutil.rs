// src/timeutil.rs
// Civil-time helpers. All dates and clock strings in this crate are computed
// in the feed's home zone (Asia/Shanghai, fixed UTC+8, no DST).

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;

static BEIJING: Lazy<FixedOffset> =
    Lazy::new(|| FixedOffset::east_opt(8 * 3600).expect("valid +08:00 offset"));

pub fn now_beijing() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&*BEIJING)
}

/// `YYYY-MM-DD HH:MM:SS`, the stamp used in logs, rollups and webhook payloads.
pub fn format_datetime(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn to_beijing(ts: i64) -> Option<DateTime<FixedOffset>> {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.with_timezone(&*BEIJING))
}

/// `HH:MM` for a unix timestamp, empty string when out of range.
pub fn hhmm(ts: i64) -> String {
    to_beijing(ts)
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_default()
}

/// Calendar date an item belongs to, derived from its own timestamp rather
/// than from the fetch time.
pub fn civil_date(ts: i64) -> Option<NaiveDate> {
    to_beijing(ts).map(|dt| dt.date_naive())
}

pub fn date_str(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
