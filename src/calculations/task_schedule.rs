use crate::calendar::CalendarView;
use crate::error::PlanResult;
use crate::predecessors::PredecessorResolver;
use crate::task::{Task, TaskType};
use crate::time::{DateTime, TimeSpan};

/// Computed position of one task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub start: DateTime,
    pub end: DateTime,
    pub duration: TimeSpan,
    pub work: TimeSpan,
}

/// Places one leaf task. Predecessors (and the predecessors of enclosing
/// summaries) must already hold their final start and end.
pub struct TaskScheduler<'a> {
    tasks: &'a [Task],
    calendar: CalendarView<'a>,
    default_start: DateTime,
}

impl<'a> TaskScheduler<'a> {
    pub fn new(tasks: &'a [Task], calendar: CalendarView<'a>, default_start: DateTime) -> Self {
        Self {
            tasks,
            calendar,
            default_start,
        }
    }

    /// `units` is the resource capacity assigned to the task; it divides
    /// work into elapsed span and multiplies span back into work.
    pub fn schedule(&self, index: usize, units: f64) -> PlanResult<Timing> {
        let task = &self.tasks[index];
        if task.task_type == TaskType::FixedPeriod {
            return Ok(self.fixed_period(task, units));
        }

        let resolver = PredecessorResolver::new(self.tasks, self.calendar);
        let mut start_limit = resolver.inherited_start(index)?;
        let finish_limit = resolver.inherited_end(index)?;
        if task.task_type.is_start_on() {
            start_limit = match (start_limit, task.start_on) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
        }

        let span = task.projected_span(units);
        let (start, end) = if span.is_zero() {
            let at = match (start_limit, finish_limit) {
                (None, None) => self.calendar.work_date_time_up(self.default_start)?,
                (a, b) => {
                    let pinned = a.max(b).unwrap_or(self.default_start);
                    self.calendar.work_end_time_down(pinned)?
                }
            };
            (at, at)
        } else if start_limit.is_some() || finish_limit.is_none() {
            let start = self
                .calendar
                .work_date_time_up(start_limit.unwrap_or(self.default_start))?;
            let end = self
                .calendar
                .work_end_time_down(self.calendar.work_time_span(start, span)?)?;
            match finish_limit {
                Some(limit) => {
                    let limit = self.calendar.work_end_time_down(limit)?;
                    if end < limit {
                        self.from_end(limit, span)?
                    } else {
                        (start, end)
                    }
                }
                None => (start, end),
            }
        } else {
            let limit = finish_limit.unwrap_or(self.default_start);
            self.from_end(self.calendar.work_end_time_down(limit)?, span)?
        };
        let end = end.max(start);

        let measured = self.calendar.work_between(start, end);
        let (duration, work) = if task.task_type.is_fixed_work() {
            (measured, task.work)
        } else {
            (task.duration, TimeSpan::days(measured.num() * units))
        };
        Ok(Timing {
            start,
            end,
            duration,
            work,
        })
    }

    fn from_end(&self, end: DateTime, span: TimeSpan) -> PlanResult<(DateTime, DateTime)> {
        let start = self
            .calendar
            .work_date_time_up(self.calendar.work_time_span(end, span.negated())?)?;
        Ok((start, end))
    }

    fn fixed_period(&self, task: &Task, units: f64) -> Timing {
        let start = task.start;
        let end = task.end.max(start);
        let duration = self.calendar.work_between(start, end);
        Timing {
            start,
            end,
            duration,
            work: TimeSpan::days(duration.num() * units),
        }
    }
}
