use super::task_schedule::Timing;
use crate::calendar::CalendarView;
use crate::task::Task;
use crate::time::TimeSpan;

/// Bounds of a summary from its direct children, which must already be
/// placed. Work adds up over the leaf tasks in the range. `None` when the
/// summary spans only null tasks.
pub fn summarize(tasks: &[Task], index: usize, calendar: &CalendarView<'_>) -> Option<Timing> {
    let span = tasks.get(tasks.get(index)?.summary_range()?)?;
    let members = || span.iter().filter(|t| !t.is_null());

    let children = || members().filter(|t| t.parent() == Some(index));
    let start = children().map(|t| t.start).min()?;
    let end = children().map(|t| t.end).max()?;
    let work: f64 = members()
        .filter(|t| !t.is_summary())
        .map(|t| t.work.to_work_days())
        .sum();

    Some(Timing {
        start,
        end,
        duration: calendar.work_between(start, end),
        work: TimeSpan::days(work),
    })
}
