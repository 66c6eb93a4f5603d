use crate::error::FormatError;
use chrono::{Datelike, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};
use std::str::FromStr;

/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// A calendar date held as a day count since 1970-01-01.
///
/// Dates outside chrono's supported range saturate when converted to
/// components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Date {
    epoch_day: i32,
}

impl Date {
    pub const EPOCH: Date = Date { epoch_day: 0 };

    pub fn from_epoch_day(epoch_day: i32) -> Self {
        Self { epoch_day }
    }

    pub fn epoch_day(self) -> i32 {
        self.epoch_day
    }

    pub fn from_ymd_opt(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self::from_naive)
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        Self {
            epoch_day: date.num_days_from_ce() - EPOCH_DAYS_FROM_CE,
        }
    }

    pub fn to_naive(self) -> NaiveDate {
        self.epoch_day
            .checked_add(EPOCH_DAYS_FROM_CE)
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .unwrap_or(if self.epoch_day < 0 {
                NaiveDate::MIN
            } else {
                NaiveDate::MAX
            })
    }

    pub fn year(self) -> i32 {
        self.to_naive().year()
    }

    pub fn month(self) -> u32 {
        self.to_naive().month()
    }

    pub fn day(self) -> u32 {
        self.to_naive().day()
    }

    pub fn weekday(self) -> Weekday {
        self.to_naive().weekday()
    }

    pub fn is_leap_year(self) -> bool {
        self.to_naive().leap_year()
    }

    /// Number of days in this date's month.
    pub fn days_in_month(self) -> u32 {
        let date = self.to_naive();
        let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1);
        let next = first.and_then(|f| f.checked_add_months(Months::new(1)));
        match (first, next) {
            (Some(first), Some(next)) => (next - first).num_days() as u32,
            _ => 31,
        }
    }

    pub fn days_in_year(self) -> u32 {
        if self.is_leap_year() { 366 } else { 365 }
    }

    pub fn plus_days(self, days: i64) -> Self {
        let shifted = (self.epoch_day as i64 + days).clamp(i32::MIN as i64, i32::MAX as i64);
        Self {
            epoch_day: shifted as i32,
        }
    }

    pub fn next(self) -> Self {
        self.plus_days(1)
    }

    pub fn previous(self) -> Self {
        self.plus_days(-1)
    }

    /// Steps whole months, keeping the day-of-month where the landing month
    /// has it and clamping to that month's last day otherwise.
    pub fn plus_months(self, months: i32) -> Self {
        let date = self.to_naive();
        let shifted = if months >= 0 {
            date.checked_add_months(Months::new(months as u32))
        } else {
            date.checked_sub_months(Months::new(months.unsigned_abs()))
        };
        Self::from_naive(shifted.unwrap_or(if months >= 0 {
            NaiveDate::MAX
        } else {
            NaiveDate::MIN
        }))
    }

    pub fn plus_years(self, years: i32) -> Self {
        self.plus_months(years.saturating_mul(12))
    }

    /// Signed number of days from `self` to `other`.
    pub fn days_until(self, other: Date) -> i64 {
        other.epoch_day as i64 - self.epoch_day as i64
    }

    /// Formats with a chrono strftime pattern.
    pub fn format(self, pattern: &str) -> Result<String, FormatError> {
        let mut out = String::new();
        write!(out, "{}", self.to_naive().format(pattern))
            .map_err(|_| FormatError::new("date pattern", pattern, "unsupported specifier"))?;
        Ok(out)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_naive().format("%Y-%m-%d"))
    }
}

impl FromStr for Date {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Self::from_naive)
            .map_err(|err| FormatError::new("date", s, err.to_string()))
    }
}

impl From<Date> for String {
    fn from(date: Date) -> Self {
        date.to_string()
    }
}

impl TryFrom<String> for Date {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_is_1970_01_01() {
        assert_eq!(Date::EPOCH.to_string(), "1970-01-01");
        assert_eq!(Date::from_ymd_opt(1969, 12, 31).unwrap().epoch_day(), -1);
    }

    #[test]
    fn month_stepping_clamps_to_month_end() {
        let jan31 = Date::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(jan31.plus_months(1).to_string(), "2024-02-29");
        assert_eq!(jan31.plus_months(-2).to_string(), "2023-11-30");
        let leap = Date::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(leap.plus_years(1).to_string(), "2025-02-28");
    }

    #[test]
    fn days_in_month_handles_february() {
        assert_eq!(Date::from_ymd_opt(2023, 2, 10).unwrap().days_in_month(), 28);
        assert_eq!(Date::from_ymd_opt(2024, 2, 10).unwrap().days_in_month(), 29);
        assert_eq!(Date::from_ymd_opt(2024, 12, 1).unwrap().days_in_month(), 31);
    }

    #[test]
    fn bad_pattern_is_a_format_error() {
        let date = Date::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(date.format("%d/%m/%Y").unwrap(), "05/03/2024");
        assert!(date.format("%Q").is_err());
    }
}
