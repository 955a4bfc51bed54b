use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Granularity that drag and click positions snap to.
pub const SNAP_INCREMENT_MINUTES: i64 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    #[error("invalid time '{0}' (expected HH:MM)")]
    InvalidFormat(String),
}

/// Wall-clock time of day with minute precision, always in `[00:00, 23:59]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);

    /// Builds a time from minutes since midnight; `None` outside `[0, 1440)`.
    pub fn from_minutes(minutes: i64) -> Option<Self> {
        if (0..MINUTES_PER_DAY).contains(&minutes) {
            Some(Self(minutes as u16))
        } else {
            None
        }
    }

    pub fn minutes(self) -> i64 {
        i64::from(self.0)
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        to_minutes(s).map(|m| Self(m as u16))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parses `HH:MM` into minutes since midnight.
///
/// Both fields must be one or two ASCII digits; hours in `[0, 23]`,
/// minutes in `[0, 59]`.
pub fn to_minutes(time: &str) -> Result<i64, TimeError> {
    let invalid = || TimeError::InvalidFormat(time.to_string());
    let (hours, minutes) = time.trim().split_once(':').ok_or_else(invalid)?;
    let hours = parse_field(hours).ok_or_else(invalid)?;
    let minutes = parse_field(minutes).ok_or_else(invalid)?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

fn parse_field(field: &str) -> Option<i64> {
    if field.is_empty() || field.len() > 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// Formats minutes as zero-padded `HH:MM`, wrapping at midnight.
pub fn to_time_string(minutes: i64) -> String {
    let wrapped = minutes.rem_euclid(MINUTES_PER_DAY);
    format!("{:02}:{:02}", wrapped / 60, wrapped % 60)
}

/// `end - start` in minutes. Negative when `end` precedes `start`; callers
/// decide whether that is acceptable.
pub fn duration(start: &str, end: &str) -> Result<i64, TimeError> {
    Ok(to_minutes(end)? - to_minutes(start)?)
}

/// Rounds a continuous minute value to the nearest snap increment, ties up.
pub fn snap_minutes(minutes: f64) -> i64 {
    let increments = (minutes / SNAP_INCREMENT_MINUTES as f64 + 0.5).floor();
    increments as i64 * SNAP_INCREMENT_MINUTES
}

/// Converts a vertical position on the day grid (0.0 = midnight, 1.0 = the
/// following midnight) into a snapped time of day. The last slot that can
/// still hold a task, 23:45, is the latest result.
pub fn time_at_fraction(fraction: f64) -> TimeOfDay {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let minutes = snap_minutes((fraction * MINUTES_PER_DAY as f64).floor());
    TimeOfDay(minutes.clamp(0, MINUTES_PER_DAY - SNAP_INCREMENT_MINUTES) as u16)
}
