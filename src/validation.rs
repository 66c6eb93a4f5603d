use crate::calendar::Calendar;
use crate::error::{FormatError, PlanError, PlanResult};
use crate::predecessors::Predecessors;
use crate::task::{MAX_PRIORITY, Task};

/// Predecessor references must name another existing task.
pub fn validate_predecessors(
    index: usize,
    predecessors: &Predecessors,
    task_count: usize,
) -> Result<(), FormatError> {
    for predecessor in predecessors {
        if predecessor.task == index {
            return Err(FormatError::new(
                "predecessors",
                predecessors.to_string(),
                format!("task {index} cannot precede itself"),
            ));
        }
        if predecessor.task >= task_count {
            return Err(FormatError::new(
                "predecessors",
                predecessors.to_string(),
                format!("task {} does not exist", predecessor.task),
            ));
        }
    }
    Ok(())
}

/// Checks the values a loaded task carries outside the text grammars.
pub fn validate_task(index: usize, task: &Task) -> PlanResult<()> {
    if task.duration.is_negative() || task.work.is_negative() {
        return Err(PlanError::invalid(format!(
            "task {index} has negative duration {} or work {}",
            task.duration, task.work
        )));
    }
    if task.priority > MAX_PRIORITY {
        return Err(PlanError::invalid(format!(
            "task {index} priority {} exceeds {MAX_PRIORITY}",
            task.priority
        )));
    }
    if !task.cost.is_finite() {
        return Err(PlanError::invalid(format!("task {index} has non-finite cost")));
    }
    Ok(())
}

pub fn validate_calendar(calendar: &Calendar, day_count: usize) -> PlanResult<()> {
    if calendar.cycle_length() == 0 {
        return Err(PlanError::invalid(format!(
            "calendar '{}' has an empty cycle",
            calendar.name()
        )));
    }
    if let Some(missing) = calendar.day_ids().find(|id| *id >= day_count) {
        return Err(PlanError::invalid(format!(
            "calendar '{}' references day {missing} but only {day_count} exist",
            calendar.name()
        )));
    }
    Ok(())
}
