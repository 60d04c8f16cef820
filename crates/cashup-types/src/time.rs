use chrono::{DateTime, Datelike, FixedOffset, Utc};

/// `YYYY-MM-DD` day key in the given local offset.
pub fn local_date_key(now: DateTime<Utc>, offset: FixedOffset) -> String {
    now.with_timezone(&offset).format("%Y-%m-%d").to_string()
}

/// `YYYY-Www` ISO week key in the given local offset. The year is the
/// ISO week-year, which differs from the calendar year around January 1.
pub fn local_iso_week_key(now: DateTime<Utc>, offset: FixedOffset) -> String {
    let local = now.with_timezone(&offset);
    let week = local.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}
