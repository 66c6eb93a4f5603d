use super::{Date, MS_PER_DAY, Time, format_clock};
use crate::error::{FormatError, PlanError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};
use std::str::FromStr;

/// An instant held as signed milliseconds since 1970-01-01 00:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct DateTime {
    ms: i64,
}

impl DateTime {
    pub fn new(date: Date, time: Time) -> Self {
        Self::from_date_ms(date, time.milliseconds())
    }

    /// Combines a date with a clock offset that may equal one full day
    /// (a `24:00` period end), which lands on the next date's midnight.
    pub(crate) fn from_date_ms(date: Date, ms_of_day: i64) -> Self {
        Self {
            ms: (date.epoch_day() as i64 * MS_PER_DAY).saturating_add(ms_of_day),
        }
    }

    pub const EPOCH: DateTime = DateTime { ms: 0 };

    pub fn from_milliseconds(ms: i64) -> Self {
        Self { ms }
    }

    pub fn milliseconds(self) -> i64 {
        self.ms
    }

    /// The date part, flooring toward negative infinity so instants before
    /// the epoch still decompose into a (date, time) pair.
    pub fn date(self) -> Date {
        let day = self.ms.div_euclid(MS_PER_DAY);
        Date::from_epoch_day(day.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
    }

    pub fn time(self) -> Time {
        Time::from_milliseconds(self.time_ms()).unwrap_or(Time::MIDNIGHT)
    }

    pub(crate) fn time_ms(self) -> i64 {
        self.ms.rem_euclid(MS_PER_DAY)
    }

    pub fn plus_milliseconds(self, ms: i64) -> Self {
        Self {
            ms: self.ms.saturating_add(ms),
        }
    }

    pub fn plus_days(self, days: i64) -> Self {
        self.plus_milliseconds(days.saturating_mul(MS_PER_DAY))
    }

    /// Rounds down to the start of the enclosing interval.
    pub fn truncate(self, interval: Interval) -> Self {
        let floor_to = |unit: i64| Self {
            ms: self.ms - self.ms.rem_euclid(unit),
        };
        let date = self.date();
        let first_of = |month: u32| {
            Date::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
        };
        match interval {
            Interval::Second => floor_to(1000),
            Interval::Minute => floor_to(60_000),
            Interval::Hour => floor_to(3_600_000),
            Interval::Day => Self::new(date, Time::MIDNIGHT),
            Interval::Week => {
                let back = date.weekday().num_days_from_monday() as i64;
                Self::new(date.plus_days(-back), Time::MIDNIGHT)
            }
            Interval::Month => Self::new(first_of(date.month()), Time::MIDNIGHT),
            Interval::Quarter => {
                Self::new(first_of((date.month() - 1) / 3 * 3 + 1), Time::MIDNIGHT)
            }
            Interval::HalfYear => {
                let month = if date.month() <= 6 { 1 } else { 7 };
                Self::new(first_of(month), Time::MIDNIGHT)
            }
            Interval::Year => Self::new(first_of(1), Time::MIDNIGHT),
        }
    }

    pub fn to_naive(self) -> NaiveDateTime {
        let date = self.date().to_naive();
        let time = self.time();
        date.and_hms_milli_opt(
            time.hour(),
            time.minute(),
            time.second(),
            time.millisecond(),
        )
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN))
    }

    /// Formats with a chrono strftime pattern.
    pub fn format(self, pattern: &str) -> Result<String, FormatError> {
        let mut out = String::new();
        write!(out, "{}", self.to_naive().format(pattern))
            .map_err(|_| FormatError::new("date-time pattern", pattern, "unsupported specifier"))?;
        Ok(out)
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date(), format_clock(self.time_ms()))
    }
}

impl FromStr for DateTime {
    type Err = FormatError;

    /// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM[:SS[.mmm]]` or the same with a
    /// `T` separator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let (date_text, time_text) = match text.split_once(|c: char| c == ' ' || c == 'T') {
            Some((date, time)) => (date, Some(time)),
            None => (text, None),
        };
        let date: Date = date_text
            .parse()
            .map_err(|err: FormatError| FormatError::new("date-time", s, err.reason))?;
        let time = match time_text {
            Some(time) => time
                .parse::<Time>()
                .map_err(|err| FormatError::new("date-time", s, err.reason))?,
            None => Time::MIDNIGHT,
        };
        Ok(Self::new(date, time))
    }
}

impl From<DateTime> for String {
    fn from(value: DateTime) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for DateTime {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Truncation granularity, matching the scales a Gantt view steps through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    HalfYear,
    Year,
}

impl Interval {
    pub const ALL: [Interval; 9] = [
        Interval::Second,
        Interval::Minute,
        Interval::Hour,
        Interval::Day,
        Interval::Week,
        Interval::Month,
        Interval::Quarter,
        Interval::HalfYear,
        Interval::Year,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Second => "second",
            Interval::Minute => "minute",
            Interval::Hour => "hour",
            Interval::Day => "day",
            Interval::Week => "week",
            Interval::Month => "month",
            Interval::Quarter => "quarter",
            Interval::HalfYear => "half-year",
            Interval::Year => "year",
        }
    }
}

impl FromStr for Interval {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|interval| interval.as_str() == wanted)
            .ok_or_else(|| PlanError::invalid(format!("unknown interval '{s}'")))
    }
}
