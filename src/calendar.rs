use crate::day::{Day, EVENING_DAY, NON_WORKING_DAY, SHORT_DAY, STANDARD_DAY, TWENTY_FOUR_HOUR_DAY};
use crate::error::{PlanError, PlanResult};
use crate::validation::validate_calendar;
use crate::time::{Date, DateTime, MS_PER_DAY, TimeSpan, TimeUnit, WORK_DAY_MS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default number of consecutive non-working days a search may cross.
pub const DEFAULT_SCAN_LIMIT: u32 = 400;

/// Furthest a span may move an instant, about ten thousand years.
pub const MAX_SPAN_DAYS: i64 = 3_652_500;

/// Last instant of a day, standing in for a `24:00` period end when
/// rounding down so the result stays on the working date.
const LAST_MS_OF_DAY: i64 = MS_PER_DAY - 1;

/// A repeating cycle of day-types anchored at a date, with per-date
/// exceptions. Days are referenced by their index in the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    name: String,
    anchor: Date,
    cycle: Vec<usize>,
    #[serde(default)]
    exceptions: BTreeMap<Date, usize>,
}

impl Calendar {
    pub fn new(name: impl Into<String>, anchor: Date, cycle: Vec<usize>) -> PlanResult<Self> {
        let name = name.into();
        if cycle.is_empty() {
            return Err(PlanError::invalid(format!("calendar '{name}' needs at least one day in its cycle")));
        }
        Ok(Self {
            name,
            anchor,
            cycle,
            exceptions: BTreeMap::new(),
        })
    }

    /// Monday 2000-01-03, the anchor of every built-in calendar.
    pub fn builtin_anchor() -> Date {
        Date::from_epoch_day(10_959)
    }

    fn weekly(name: &str, weekday: usize) -> Self {
        let mut cycle = vec![weekday; 5];
        cycle.extend([NON_WORKING_DAY; 2]);
        Self {
            name: name.to_string(),
            anchor: Self::builtin_anchor(),
            cycle,
            exceptions: BTreeMap::new(),
        }
    }

    /// The four calendars every new plan starts with, in index order.
    /// Day references assume the layout of [`Day::builtins`].
    pub fn builtins() -> Vec<Calendar> {
        vec![
            Self::weekly("Standard", STANDARD_DAY),
            Self {
                name: "Full Time".to_string(),
                anchor: Self::builtin_anchor(),
                cycle: vec![TWENTY_FOUR_HOUR_DAY],
                exceptions: BTreeMap::new(),
            },
            Self::weekly("Evening", EVENING_DAY),
            Self::weekly("Part Time", SHORT_DAY),
        ]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn anchor(&self) -> Date {
        self.anchor
    }

    pub fn set_anchor(&mut self, anchor: Date) {
        self.anchor = anchor;
    }

    pub fn cycle(&self) -> &[usize] {
        &self.cycle
    }

    pub fn cycle_length(&self) -> usize {
        self.cycle.len()
    }

    /// Resizes the cycle, repeating the existing pattern when it grows.
    pub fn set_cycle_length(&mut self, length: usize) -> PlanResult<()> {
        if length == 0 {
            return Err(PlanError::invalid(format!("calendar '{}' cycle cannot be empty", self.name)));
        }
        let pattern = self.cycle.clone();
        self.cycle = (0..length).map(|i| pattern[i % pattern.len()]).collect();
        Ok(())
    }

    pub fn normal_day(&self, position: usize) -> Option<usize> {
        self.cycle.get(position).copied()
    }

    pub fn set_normal_day(&mut self, position: usize, day: usize) -> PlanResult<()> {
        let len = self.cycle.len();
        let slot = self.cycle.get_mut(position).ok_or_else(|| {
            PlanError::invalid(format!("cycle position {position} beyond length {len}"))
        })?;
        *slot = day;
        Ok(())
    }

    pub fn exceptions(&self) -> &BTreeMap<Date, usize> {
        &self.exceptions
    }

    pub fn exception(&self, date: Date) -> Option<usize> {
        self.exceptions.get(&date).copied()
    }

    /// Overrides the cycle for one date; `None` restores the cycle.
    pub fn set_exception(&mut self, date: Date, day: Option<usize>) {
        match day {
            Some(day) => {
                self.exceptions.insert(date, day);
            }
            None => {
                self.exceptions.remove(&date);
            }
        }
    }

    /// Index of the day-type in effect on `date`.
    pub fn day_id(&self, date: Date) -> usize {
        if let Some(day) = self.exceptions.get(&date) {
            return *day;
        }
        let offset = self.anchor.days_until(date);
        let position = offset.rem_euclid(self.cycle.len() as i64) as usize;
        self.cycle[position]
    }

    pub(crate) fn day_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.cycle.iter().chain(self.exceptions.values()).copied()
    }

    /// Rewrites day references after the plan's day list changed.
    pub(crate) fn remap_days(&mut self, map: impl Fn(usize) -> usize) {
        for day in &mut self.cycle {
            *day = map(*day);
        }
        for day in self.exceptions.values_mut() {
            *day = map(*day);
        }
    }
}

/// A calendar resolved against the plan's day-types. All scheduling
/// arithmetic goes through this view.
#[derive(Debug, Clone, Copy)]
pub struct CalendarView<'a> {
    calendar: &'a Calendar,
    days: &'a [Day],
    scan_limit: u32,
}

impl<'a> CalendarView<'a> {
    pub fn new(calendar: &'a Calendar, days: &'a [Day], scan_limit: u32) -> PlanResult<Self> {
        validate_calendar(calendar, days.len())?;
        Ok(Self {
            calendar,
            days,
            scan_limit,
        })
    }

    pub fn calendar(&self) -> &'a Calendar {
        self.calendar
    }

    pub fn day(&self, date: Date) -> &'a Day {
        &self.days[self.calendar.day_id(date)]
    }

    pub fn is_working(&self, date: Date) -> bool {
        self.day(date).is_working()
    }

    /// True if `at` lies inside (or on the edge of) a work period. Midnight
    /// also counts when the previous day works until `24:00`.
    pub fn is_working_instant(&self, at: DateTime) -> bool {
        let t = at.time_ms();
        if self.day(at.date()).periods().iter().any(|p| p.contains(t)) {
            return true;
        }
        t == 0 && self.day(at.date().previous()).end_ms() == Some(MS_PER_DAY)
    }

    fn no_working_time(&self, from: DateTime) -> PlanError {
        tracing::warn!(calendar = %self.calendar.name, %from, limit = self.scan_limit, "no working time within scan limit");
        PlanError::NoWorkingTime {
            calendar: self.calendar.name.clone(),
            from,
        }
    }

    /// `at` if it is a working instant, otherwise the next one.
    pub fn work_date_time_up(&self, at: DateTime) -> PlanResult<DateTime> {
        let date = at.date();
        let t = at.time_ms();
        for period in self.day(date).periods() {
            if period.contains(t) {
                return Ok(at);
            }
            if period.start_ms() > t {
                return Ok(DateTime::from_date_ms(date, period.start_ms()));
            }
        }
        let mut next = date;
        for _ in 0..self.scan_limit {
            next = next.next();
            if let Some(start) = self.day(next).start_ms() {
                return Ok(DateTime::from_date_ms(next, start));
            }
        }
        Err(self.no_working_time(at))
    }

    /// `at` if it is a working instant, otherwise the previous one. A period
    /// ending at `24:00` yields the last millisecond of its own day.
    pub fn work_date_time_down(&self, at: DateTime) -> PlanResult<DateTime> {
        let date = at.date();
        let t = at.time_ms();
        for period in self.day(date).periods().iter().rev() {
            if period.contains(t) {
                return Ok(at);
            }
            if period.end_ms() < t {
                return Ok(DateTime::from_date_ms(date, period.end_ms().min(LAST_MS_OF_DAY)));
            }
        }
        let mut previous = date;
        for _ in 0..self.scan_limit {
            previous = previous.previous();
            if let Some(end) = self.day(previous).end_ms() {
                return Ok(DateTime::from_date_ms(previous, end.min(LAST_MS_OF_DAY)));
            }
        }
        Err(self.no_working_time(at))
    }

    /// Rounds the end of a piece of work down. Differs from
    /// [`Self::work_date_time_down`] only for a period closing at `24:00`,
    /// which ends at the following midnight.
    pub fn work_end_time_down(&self, at: DateTime) -> PlanResult<DateTime> {
        if self.is_working_instant(at) {
            return Ok(at);
        }
        let down = self.work_date_time_down(at)?;
        if down.time_ms() == LAST_MS_OF_DAY && self.day(down.date()).end_ms() == Some(MS_PER_DAY) {
            return Ok(down.plus_milliseconds(1));
        }
        Ok(down)
    }

    /// Exact work in milliseconds between two instants; negative when
    /// `end` precedes `start`.
    pub fn work_ms_between(&self, start: DateTime, end: DateTime) -> i64 {
        if end < start {
            return -self.work_ms_between(end, start);
        }
        let (first, last) = (start.date(), end.date());
        if first == last {
            let day = self.day(first);
            return day.work_done_ms(end.time_ms()) - day.work_done_ms(start.time_ms());
        }
        let mut total = self.day(first).work_to_go_ms(start.time_ms());
        let mut date = first.next();
        while date < last {
            total += self.day(date).work_ms();
            date = date.next();
        }
        total + self.day(last).work_done_ms(end.time_ms())
    }

    /// Work between two instants in work days.
    pub fn work_between(&self, start: DateTime, end: DateTime) -> TimeSpan {
        TimeSpan::days(self.work_ms_between(start, end) as f64 / WORK_DAY_MS as f64)
    }

    /// Moves `start` by `span`. Days are work-adjusted; seconds, minutes
    /// and hours elapse in wall-clock time; weeks are seven calendar days;
    /// months and years step the calendar and spread the fraction over
    /// the landing month or year. Results more than [`MAX_SPAN_DAYS`]
    /// calendar days away are rejected.
    pub fn work_time_span(&self, start: DateTime, span: TimeSpan) -> PlanResult<DateTime> {
        let num = span.num();
        let end = match span.unit() {
            TimeUnit::Seconds | TimeUnit::Minutes | TimeUnit::Hours => {
                self.work_seconds(start, span.wall_milliseconds().unwrap_or(0))
            }
            TimeUnit::Days => self.work_days(start, num)?,
            TimeUnit::Weeks => start.plus_milliseconds((num * 7.0 * MS_PER_DAY as f64).round() as i64),
            TimeUnit::Months => {
                let whole = num.trunc();
                let date = start.date().plus_months(whole as i32);
                let fraction = (num - whole) * date.days_in_month() as f64;
                DateTime::from_date_ms(date, start.time_ms())
                    .plus_milliseconds((fraction * MS_PER_DAY as f64).round() as i64)
            }
            TimeUnit::Years => {
                let whole = num.trunc();
                let date = start.date().plus_years(whole as i32);
                let fraction = (num - whole) * date.days_in_year() as f64;
                DateTime::from_date_ms(date, start.time_ms())
                    .plus_milliseconds((fraction * MS_PER_DAY as f64).round() as i64)
            }
        };
        if start.date().days_until(end.date()).abs() > MAX_SPAN_DAYS {
            return Err(out_of_range(span, start));
        }
        Ok(end)
    }

    /// Elapsed wall-clock time; work periods play no part.
    pub fn work_seconds(&self, start: DateTime, ms: i64) -> DateTime {
        start.plus_milliseconds(ms)
    }

    /// Advances (or retreats, when negative) by `days` of work. Stretches
    /// free of exceptions are crossed a whole cycle at a time.
    pub fn work_days(&self, start: DateTime, days: f64) -> PlanResult<DateTime> {
        let work = (days * WORK_DAY_MS as f64).round() as i64;
        let forward = work >= 0;
        let step: i64 = if forward { 1 } else { -1 };
        let cycle_days = self.calendar.cycle.len() as i64;
        let cycle_work: i64 = self.calendar.cycle.iter().map(|id| self.days[*id].work_ms()).sum();
        let mut left = work.saturating_abs();
        let mut date = start.date();
        let mut t = start.time_ms();
        let mut idle = 0;
        loop {
            if start.date().days_until(date).abs() > MAX_SPAN_DAYS {
                return Err(out_of_range(TimeSpan::days(days), start));
            }
            let at_day_edge = if forward { t == 0 } else { t == MS_PER_DAY };
            if at_day_edge && cycle_work > 0 && left > cycle_work {
                let cycles = self.whole_cycles(date, forward, cycle_days, (left - 1) / cycle_work);
                if cycles > 0 {
                    date = date.plus_days(step * cycles * cycle_days);
                    left -= cycles * cycle_work;
                    idle = 0;
                    continue;
                }
            }

            let day = self.day(date);
            let reached = if forward {
                day.work_ms_forward(t, left)
            } else {
                day.work_ms_backward(t, left)
            };
            if let Some(at) = reached {
                return Ok(DateTime::from_date_ms(date, at));
            }
            let available = if forward {
                day.work_to_go_ms(t)
            } else {
                day.work_done_ms(t)
            };
            left -= available;
            if available == 0 {
                idle += 1;
                if idle > self.scan_limit {
                    return Err(self.no_working_time(start));
                }
            } else {
                idle = 0;
            }
            if forward {
                date = date.next();
                t = 0;
            } else {
                date = date.previous();
                t = MS_PER_DAY;
            }
        }
    }

    /// How many whole cycles (at most `wanted`) can be crossed from `date`
    /// before reaching an exception date.
    fn whole_cycles(&self, date: Date, forward: bool, cycle_days: i64, wanted: i64) -> i64 {
        let exception = if forward {
            self.calendar.exceptions.range(date..).next()
        } else {
            self.calendar.exceptions.range(..=date).next_back()
        };
        let room = match exception {
            Some((at, _)) => date.days_until(*at).abs() / cycle_days,
            None => MAX_SPAN_DAYS / cycle_days + 1,
        };
        wanted.min(room)
    }
}

fn out_of_range(span: TimeSpan, from: DateTime) -> PlanError {
    tracing::warn!(%span, %from, limit = MAX_SPAN_DAYS, "span leaves the supported date range");
    PlanError::SpanOutOfRange {
        span: span.to_string(),
        from,
    }
}
