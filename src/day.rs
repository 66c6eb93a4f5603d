use crate::error::{FormatError, PlanError, PlanResult};
use crate::time::{MS_PER_DAY, MS_PER_HOUR, WORK_DAY_MS, format_clock, parse_clock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Index of the built-in standard 8-hour day.
pub const STANDARD_DAY: usize = 0;
pub const NON_WORKING_DAY: usize = 1;
pub const TWENTY_FOUR_HOUR_DAY: usize = 2;
pub const EVENING_DAY: usize = 3;
pub const SHORT_DAY: usize = 4;

/// One working interval within a day, in milliseconds since midnight.
/// The end may be `24:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct WorkPeriod {
    start: i64,
    end: i64,
}

impl WorkPeriod {
    pub fn new(start_ms: i64, end_ms: i64) -> PlanResult<Self> {
        if start_ms < 0 || end_ms > MS_PER_DAY || start_ms >= end_ms {
            return Err(PlanError::invalid(format!(
                "work period {}-{} must satisfy 00:00 <= start < end <= 24:00",
                format_clock(start_ms.max(0)),
                format_clock(end_ms.max(0))
            )));
        }
        Ok(Self {
            start: start_ms,
            end: end_ms,
        })
    }

    fn hours(start: i64, end: i64) -> Self {
        Self {
            start: start * MS_PER_HOUR,
            end: end * MS_PER_HOUR,
        }
    }

    pub fn start_ms(self) -> i64 {
        self.start
    }

    pub fn end_ms(self) -> i64 {
        self.end
    }

    pub fn duration_ms(self) -> i64 {
        self.end - self.start
    }

    /// Inclusive at both ends.
    pub fn contains(self, ms: i64) -> bool {
        (self.start..=self.end).contains(&ms)
    }
}

impl fmt::Display for WorkPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", format_clock(self.start), format_clock(self.end))
    }
}

impl FromStr for WorkPeriod {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| FormatError::new("work period", s, "expected HH:MM-HH:MM"))?;
        let start = parse_clock(start, "work period")?;
        let end = parse_clock(end, "work period")?;
        Self::new(start, end).map_err(|_| FormatError::new("work period", s, "start must precede end"))
    }
}

impl From<WorkPeriod> for String {
    fn from(period: WorkPeriod) -> Self {
        period.to_string()
    }
}

impl TryFrom<String> for WorkPeriod {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A day-type: the working pattern shared by every date a calendar maps to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    name: String,
    periods: Vec<WorkPeriod>,
}

impl Day {
    /// A day with no working time.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            periods: Vec::new(),
        }
    }

    pub fn with_periods(name: impl Into<String>, periods: Vec<WorkPeriod>) -> PlanResult<Self> {
        validate_periods(&periods)?;
        Ok(Self {
            name: name.into(),
            periods,
        })
    }

    pub fn standard() -> Self {
        Self {
            name: "Standard work day".to_string(),
            periods: vec![WorkPeriod::hours(8, 12), WorkPeriod::hours(13, 17)],
        }
    }

    pub fn non_working() -> Self {
        Self::new("Non working")
    }

    pub fn twenty_four_hours() -> Self {
        Self {
            name: "24 hours".to_string(),
            periods: vec![WorkPeriod::hours(0, 24)],
        }
    }

    pub fn evening() -> Self {
        Self {
            name: "Evening shift".to_string(),
            periods: vec![WorkPeriod::hours(18, 22), WorkPeriod::hours(23, 24)],
        }
    }

    pub fn short() -> Self {
        Self {
            name: "Short day".to_string(),
            periods: vec![WorkPeriod::hours(9, 13)],
        }
    }

    /// The five day-types every new plan starts with, in index order.
    pub fn builtins() -> Vec<Day> {
        vec![
            Self::standard(),
            Self::non_working(),
            Self::twenty_four_hours(),
            Self::evening(),
            Self::short(),
        ]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn periods(&self) -> &[WorkPeriod] {
        &self.periods
    }

    pub fn set_periods(&mut self, periods: Vec<WorkPeriod>) -> PlanResult<()> {
        validate_periods(&periods)?;
        self.periods = periods;
        Ok(())
    }

    /// Grows or shrinks the period list. New periods are one hour long and
    /// follow the last existing one.
    pub fn set_period_count(&mut self, count: usize) -> PlanResult<()> {
        let mut periods = self.periods.clone();
        periods.truncate(count);
        while periods.len() < count {
            let from = periods.last().map_or(8 * MS_PER_HOUR, |p| p.end);
            let period = WorkPeriod::new(from, (from + MS_PER_HOUR).min(MS_PER_DAY))
                .map_err(|_| PlanError::invalid(format!("no room for {count} periods in '{}'", self.name)))?;
            periods.push(period);
        }
        self.set_periods(periods)
    }

    pub fn set_period(&mut self, index: usize, period: WorkPeriod) -> PlanResult<()> {
        let mut periods = self.periods.clone();
        let slot = periods
            .get_mut(index)
            .ok_or_else(|| PlanError::invalid(format!("day '{}' has no period {index}", self.name)))?;
        *slot = period;
        self.set_periods(periods)
    }

    pub fn is_working(&self) -> bool {
        !self.periods.is_empty()
    }

    pub fn work_ms(&self) -> i64 {
        self.periods.iter().map(|p| p.duration_ms()).sum()
    }

    /// Total work in work-day units (8 working hours = 1.0).
    pub fn work(&self) -> f64 {
        self.work_ms() as f64 / WORK_DAY_MS as f64
    }

    pub fn start_ms(&self) -> Option<i64> {
        self.periods.first().map(|p| p.start)
    }

    pub fn end_ms(&self) -> Option<i64> {
        self.periods.last().map(|p| p.end)
    }

    /// Work done between midnight and `at`.
    pub fn work_done_ms(&self, at: i64) -> i64 {
        self.periods
            .iter()
            .map(|p| (at - p.start).clamp(0, p.duration_ms()))
            .sum()
    }

    /// Work remaining between `at` and midnight.
    pub fn work_to_go_ms(&self, at: i64) -> i64 {
        self.work_ms() - self.work_done_ms(at)
    }

    /// Clock time at which `work` more milliseconds of work are done,
    /// starting from `from`. `None` when the day runs out first.
    ///
    /// Finishing exactly at a period end returns that end, not the start of
    /// the next period.
    pub fn work_ms_forward(&self, from: i64, work: i64) -> Option<i64> {
        if work <= 0 {
            return Some(from);
        }
        let target = self.work_done_ms(from) + work;
        let mut done = 0;
        for period in &self.periods {
            if done + period.duration_ms() >= target {
                return Some((period.start + target - done).max(from));
            }
            done += period.duration_ms();
        }
        None
    }

    /// Latest clock time not after `from` from which `work` milliseconds of
    /// work reach `from`. `None` when the day runs out first.
    pub fn work_ms_backward(&self, from: i64, work: i64) -> Option<i64> {
        if work <= 0 {
            return Some(from);
        }
        let target = self.work_done_ms(from) - work;
        if target < 0 {
            return None;
        }
        let mut done = 0;
        for period in &self.periods {
            if done + period.duration_ms() > target {
                return Some((period.start + target - done).min(from));
            }
            done += period.duration_ms();
        }
        self.end_ms().map(|end| end.min(from))
    }
}

fn validate_periods(periods: &[WorkPeriod]) -> PlanResult<()> {
    for pair in periods.windows(2) {
        if pair[1].start < pair[0].end {
            return Err(PlanError::invalid(format!(
                "work period {} overlaps or precedes {}",
                pair[1], pair[0]
            )));
        }
    }
    Ok(())
}
