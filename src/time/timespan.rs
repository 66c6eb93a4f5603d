use super::{MS_PER_HOUR, WORK_DAY_MS};
use crate::error::{FormatError, PlanError, PlanResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Magnitudes closer than this compare equal.
const TOLERANCE: f64 = 0.01;
const WORK_DAYS_PER_WEEK: f64 = 5.0;
const WORK_DAYS_PER_YEAR: f64 = 260.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl TimeUnit {
    pub const ALL: [TimeUnit; 7] = [
        TimeUnit::Seconds,
        TimeUnit::Minutes,
        TimeUnit::Hours,
        TimeUnit::Days,
        TimeUnit::Weeks,
        TimeUnit::Months,
        TimeUnit::Years,
    ];

    pub fn symbol(self) -> char {
        match self {
            TimeUnit::Seconds => 'S',
            TimeUnit::Minutes => 'M',
            TimeUnit::Hours => 'H',
            TimeUnit::Days => 'd',
            TimeUnit::Weeks => 'w',
            TimeUnit::Months => 'm',
            TimeUnit::Years => 'y',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        Self::ALL.into_iter().find(|unit| unit.symbol() == symbol)
    }

    pub fn name(self) -> &'static str {
        match self {
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
            TimeUnit::Weeks => "weeks",
            TimeUnit::Months => "months",
            TimeUnit::Years => "years",
        }
    }

    /// Wall-clock length of one unit, for the units that elapse in real time.
    pub fn wall_milliseconds(self) -> Option<i64> {
        match self {
            TimeUnit::Seconds => Some(1000),
            TimeUnit::Minutes => Some(60_000),
            TimeUnit::Hours => Some(MS_PER_HOUR),
            _ => None,
        }
    }

    /// How many work days one unit of effort represents.
    pub fn work_days(self) -> f64 {
        match self {
            TimeUnit::Seconds => 1000.0 / WORK_DAY_MS as f64,
            TimeUnit::Minutes => 60_000.0 / WORK_DAY_MS as f64,
            TimeUnit::Hours => MS_PER_HOUR as f64 / WORK_DAY_MS as f64,
            TimeUnit::Days => 1.0,
            TimeUnit::Weeks => WORK_DAYS_PER_WEEK,
            TimeUnit::Months => WORK_DAYS_PER_YEAR / 12.0,
            TimeUnit::Years => WORK_DAYS_PER_YEAR,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = PlanError;

    /// Accepts a unit symbol (`S M H d w m y`) or its name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let mut chars = text.chars();
        if let (Some(symbol), None) = (chars.next(), chars.next()) {
            if let Some(unit) = Self::from_symbol(symbol) {
                return Ok(unit);
            }
        }
        Self::ALL
            .into_iter()
            .find(|unit| unit.name().eq_ignore_ascii_case(text))
            .ok_or_else(|| PlanError::invalid(format!("unknown time unit '{s}'")))
    }
}

/// A signed magnitude tagged with a unit.
///
/// Seconds are whole numbers; every other unit keeps two decimal places.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TimeSpan {
    num: f64,
    unit: TimeUnit,
}

impl TimeSpan {
    pub fn new(num: f64, unit: TimeUnit) -> Self {
        let num = if num.is_finite() { num } else { 0.0 };
        let num = match unit {
            TimeUnit::Seconds => num.round(),
            _ => (num * 100.0).round() / 100.0,
        };
        // keep -0.0 out of the display
        let num = if num == 0.0 { 0.0 } else { num };
        Self { num, unit }
    }

    pub fn zero() -> Self {
        Self::new(0.0, TimeUnit::Days)
    }

    pub fn days(num: f64) -> Self {
        Self::new(num, TimeUnit::Days)
    }

    pub fn num(self) -> f64 {
        self.num
    }

    pub fn unit(self) -> TimeUnit {
        self.unit
    }

    pub fn is_zero(self) -> bool {
        self.num == 0.0
    }

    pub fn is_negative(self) -> bool {
        self.num < 0.0
    }

    pub fn negated(self) -> Self {
        Self::new(-self.num, self.unit)
    }

    /// Adds two spans of the same unit.
    pub fn plus(self, other: TimeSpan) -> PlanResult<Self> {
        if self.unit != other.unit {
            return Err(PlanError::invalid(format!(
                "cannot add {} to {}",
                other.unit.name(),
                self.unit.name()
            )));
        }
        Ok(Self::new(self.num + other.num, self.unit))
    }

    /// Effort in work days (8 working hours each).
    pub fn to_work_days(self) -> f64 {
        self.num * self.unit.work_days()
    }

    /// Wall-clock milliseconds for second, minute and hour spans.
    pub fn wall_milliseconds(self) -> Option<i64> {
        self.unit
            .wall_milliseconds()
            .map(|per_unit| (self.num * per_unit as f64).round() as i64)
    }

    /// The span without the separating space, e.g. `2.5d`.
    pub fn compact(self) -> String {
        format!("{}{}", format_magnitude(self.num, self.unit), self.unit.symbol())
    }
}

impl Default for TimeSpan {
    fn default() -> Self {
        Self::zero()
    }
}

impl PartialEq for TimeSpan {
    fn eq(&self, other: &Self) -> bool {
        // a hair above the tolerance so two-decimal values differing by
        // exactly 0.01 still compare equal after float arithmetic
        self.unit == other.unit && (self.num - other.num).abs() <= TOLERANCE + 1e-9
    }
}

fn format_magnitude(num: f64, unit: TimeUnit) -> String {
    if unit == TimeUnit::Seconds {
        return format!("{num:.0}");
    }
    let text = format!("{num:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", format_magnitude(self.num, self.unit), self.unit.symbol())
    }
}

impl FromStr for TimeSpan {
    type Err = FormatError;

    /// Parses `<number><unit>` with optional whitespace before the unit,
    /// where the unit is one of `S M H d w m y`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let split = text
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
            .unwrap_or(text.len());
        let (number, rest) = text.split_at(split);
        if number.is_empty() {
            return Err(FormatError::new("time span", s, "missing number"));
        }
        let num: f64 = number
            .parse()
            .map_err(|_| FormatError::new("time span", s, "malformed number"))?;

        let mut units = rest.trim().chars();
        let unit = match (units.next(), units.next()) {
            (Some(symbol), None) => TimeUnit::from_symbol(symbol).ok_or_else(|| {
                FormatError::new("time span", s, format!("unknown unit '{symbol}'"))
            })?,
            (None, _) => return Err(FormatError::new("time span", s, "missing unit")),
            _ => return Err(FormatError::new("time span", s, "trailing characters")),
        };
        Ok(Self::new(num, unit))
    }
}

impl From<TimeSpan> for String {
    fn from(span: TimeSpan) -> Self {
        span.to_string()
    }
}

impl TryFrom<String> for TimeSpan {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
