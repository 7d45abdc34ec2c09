use std::fmt::{Display, Formatter};

use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime};

use crate::ValidationError;

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<Date, ValidationError> {
    let ymd = format_description!("[year]-[month]-[day]");
    Date::parse(value.trim(), ymd).map_err(|_| ValidationError::InvalidDate {
        value: value.to_owned(),
    })
}

/// Formats a calendar date as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    let ymd = format_description!("[year]-[month]-[day]");
    date.format(ymd)
        .unwrap_or_else(|_| format!("{}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day()))
}

/// Current UTC calendar day.
pub fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Calendar day of a unix timestamp in milliseconds, in UTC.
pub fn date_from_unix_millis(millis: i64) -> Option<Date> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .ok()
        .map(OffsetDateTime::date)
}

/// Inclusive `[start, end]` range of calendar days requested from a history provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    pub start: Date,
    pub end: Date,
}

impl HistoryWindow {
    /// Window ending on `end` and starting `days` calendar days earlier.
    pub fn trailing(end: Date, days: u32) -> Result<Self, ValidationError> {
        let start = end
            .checked_sub(Duration::days(i64::from(days)))
            .ok_or(ValidationError::WindowOutOfRange { days })?;
        Ok(Self { start, end })
    }
}

impl Display for HistoryWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", format_date(self.start), format_date(self.end))
    }
}
