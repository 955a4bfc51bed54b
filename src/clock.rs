use crate::time::{MINUTES_PER_DAY, TimeOfDay};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Timelike, Utc};

/// Offset used when none is configured (UTC+05:30).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;

/// Resolves "now" against a single fixed UTC offset. Daylight saving and
/// named zones are not modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig {
    offset_minutes: i32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
        }
    }
}

impl ClockConfig {
    /// `None` when the offset is not strictly inside ±24 hours.
    pub fn with_offset_minutes(minutes: i32) -> Option<Self> {
        if i64::from(minutes).abs() >= MINUTES_PER_DAY {
            return None;
        }
        Some(Self {
            offset_minutes: minutes,
        })
    }

    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    pub fn offset_minutes(&self) -> i32 {
        self.offset_minutes
    }

    /// Local calendar date and time of day for an instant.
    pub fn local(&self, instant: DateTime<Utc>) -> (NaiveDate, TimeOfDay) {
        let local = instant.with_timezone(&self.offset());
        let minutes = i64::from(local.hour()) * 60 + i64::from(local.minute());
        let time = TimeOfDay::from_minutes(minutes).unwrap_or(TimeOfDay::MIDNIGHT);
        (local.date_naive(), time)
    }

    pub fn now(&self) -> (NaiveDate, TimeOfDay) {
        self.local(Utc::now())
    }
}
