use std::{
    fmt::Display,
    ops::{Add, Sub},
};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};

pub const MINUTES_PER_DAY: u16 = 24 * 60;
pub const FIRST_MINUTE: Minute = Minute(0);
pub const LAST_MINUTE: Minute = Minute(MINUTES_PER_DAY - 1);

/// Minutes since midnight of the simulated day, always within `[0, 1439]`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Minute(u16);

impl Minute {
    /// Builds a minute from any integer, clamping to the bounds of a day
    /// the same way a slider clamps its input.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(FIRST_MINUTE.0 as i64, LAST_MINUTE.0 as i64) as u16)
    }

    pub const fn as_minutes(&self) -> u16 {
        self.0
    }

    pub const fn is_last(&self) -> bool {
        self.0 == LAST_MINUTE.0
    }

    /// Next minute, or `None` at the end of the day. Never wraps.
    pub fn next(&self) -> Option<Self> {
        if self.is_last() {
            None
        } else {
            Some(Self(self.0 + 1))
        }
    }

    /// Minute of day of a wall-clock timestamp, seconds truncated.
    pub fn of(timestamp: &NaiveDateTime) -> Self {
        Self((timestamp.hour() * 60 + timestamp.minute()) as u16)
    }

    /// The absolute instant this minute denotes on the day starting at `midnight`.
    pub fn on(&self, midnight: NaiveDateTime) -> NaiveDateTime {
        midnight + TimeDelta::minutes(self.0 as i64)
    }

    pub fn to_hm_string(&self) -> String {
        format!("{:02}:{:02}", self.0 / 60, self.0 % 60)
    }

    pub fn from_hm(time: &str) -> Option<Self> {
        let mut split = time.split(':');
        let hours: u16 = split.next()?.parse().ok()?;
        let minutes: u16 = split.next()?.parse().ok()?;
        if split.next().is_some() || hours > 23 || minutes > 59 {
            return None;
        }
        Some(Self(hours * 60 + minutes))
    }
}

impl From<u16> for Minute {
    fn from(value: u16) -> Self {
        Self::clamped(value as i64)
    }
}

impl From<Minute> for u16 {
    fn from(value: Minute) -> Self {
        value.0
    }
}

impl Add<u16> for Minute {
    type Output = Self;

    fn add(self, rhs: u16) -> Self::Output {
        Self::clamped(self.0 as i64 + rhs as i64)
    }
}

impl Sub<u16> for Minute {
    type Output = Self;

    fn sub(self, rhs: u16) -> Self::Output {
        Self::clamped(self.0 as i64 - rhs as i64)
    }
}

impl Display for Minute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hm_string())
    }
}

/// Midnight at the start of the given date.
pub fn midnight_of(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Parses the timestamp shapes found in exported trip and station files.
/// Offsets are dropped and the local wall-clock time is kept.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
    let value = value.trim();
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%:z"))
                .ok()
                .map(|datetime| datetime.naive_local())
        })
}

#[test]
fn clamp_below_zero() {
    assert_eq!(Minute::clamped(-5), FIRST_MINUTE);
}

#[test]
fn clamp_above_day() {
    assert_eq!(Minute::clamped(2000), LAST_MINUTE);
}

#[test]
fn next_stops_at_last_minute() {
    assert_eq!(Minute::clamped(1438).next(), Some(LAST_MINUTE));
    assert_eq!(LAST_MINUTE.next(), None);
}

#[test]
fn parse_unparse_hm() {
    let time = "13:07";
    assert_eq!(Minute::from_hm(time).unwrap().to_hm_string(), time);
    assert_eq!(Minute::from_hm("00:00").unwrap(), FIRST_MINUTE);
    assert_eq!(Minute::from_hm("23:59").unwrap(), LAST_MINUTE);
}

#[test]
fn invalid_hm() {
    assert!(Minute::from_hm("24:00").is_none());
    assert!(Minute::from_hm("12:0a").is_none());
    assert!(Minute::from_hm("12:00:00").is_none());
}

#[test]
fn parse_timestamp_shapes() {
    let expected = NaiveDate::from_ymd_opt(2024, 11, 19)
        .unwrap()
        .and_hms_opt(8, 30, 15)
        .unwrap();
    assert_eq!(parse_timestamp("2024-11-19T08:30:15"), Some(expected));
    assert_eq!(parse_timestamp("2024-11-19 08:30:15"), Some(expected));
    assert_eq!(parse_timestamp("2024-11-19T08:30:15+01:00"), Some(expected));
    assert_eq!(parse_timestamp("2024-11-19 08:30:15+00:00"), Some(expected));
    assert_eq!(Minute::of(&parse_timestamp("2024-11-19T08:30:15.5").unwrap()).as_minutes(), 510);
    assert!(parse_timestamp("yesterday").is_none());
}
