//! Calendar-day windows in the reference offset.
//!
//! Days are cut at midnight UTC+05:30 and activity is bucketed into hours in
//! the same offset, so a day window and its hourly breakdown always agree.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use serde::Serialize;

use crate::types::ValidationError;

/// Seconds east of UTC used for day boundaries and hour buckets.
pub const REFERENCE_OFFSET_SECS: i64 = 5 * 3600 + 30 * 60;

/// Hours in a day's breakdown.
pub const HOURS_PER_DAY: usize = 24;

/// One calendar day as a half-open UTC interval `[start, end)`.
///
/// Timestamps are kept at millisecond precision, so this is the same as the
/// inclusive range `00:00:00.000 ..= 23:59:59.999` local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Builds the window for `date`.
    ///
    /// Dates at the very edge of the representable range fail, since the
    /// offset would push the UTC bounds out of range.
    pub fn new(date: NaiveDate) -> Result<Self, ValidationError> {
        let offset = Duration::seconds(REFERENCE_OFFSET_SECS);
        let start = date
            .and_time(NaiveTime::MIN)
            .and_utc()
            .checked_sub_signed(offset);
        let end = start.and_then(|start| start.checked_add_signed(Duration::days(1)));
        match (start, end) {
            (Some(start), Some(end)) => Ok(Self { date, start, end }),
            _ => Err(ValidationError::InvalidDate {
                value: date.to_string(),
            }),
        }
    }

    /// Parses a `YYYY-MM-DD` date.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ValidationError::Empty { field: "date" });
        }
        let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
            ValidationError::InvalidDate {
                value: value.to_string(),
            }
        })?;
        Self::new(date)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    /// Hour of day (0-23) of `instant` in the reference offset.
    pub fn hour_of(instant: DateTime<Utc>) -> usize {
        instant
            .checked_add_signed(Duration::seconds(REFERENCE_OFFSET_SECS))
            .and_then(|local| usize::try_from(local.hour()).ok())
            .unwrap_or_default()
    }
}
