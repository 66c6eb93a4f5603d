use super::PersistenceResult;
use crate::calendar::Calendar;
use crate::day::Day;
use crate::metadata::PlanMetadata;
use crate::plan::Plan;
use crate::resource::Resource;
use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

#[derive(Serialize, Deserialize)]
struct PlanSnapshot {
    metadata: PlanMetadata,
    days: Vec<Day>,
    calendars: Vec<Calendar>,
    tasks: Vec<Task>,
    #[serde(default)]
    resources: Vec<Resource>,
}

impl PlanSnapshot {
    fn from_plan(plan: &Plan) -> Self {
        Self {
            metadata: plan.metadata().clone(),
            days: plan.days().to_vec(),
            calendars: plan.calendars().to_vec(),
            tasks: plan.tasks().to_vec(),
            resources: plan.resources().to_vec(),
        }
    }

    fn into_plan(self) -> PersistenceResult<Plan> {
        Ok(Plan::from_parts(
            self.metadata,
            self.days,
            self.calendars,
            self.tasks,
            self.resources,
        )?)
    }
}

pub fn save_plan_to_json<P: AsRef<Path>>(plan: &Plan, path: P) -> PersistenceResult<()> {
    let file = File::create(path.as_ref())?;
    let snapshot = PlanSnapshot::from_plan(plan);
    serde_json::to_writer_pretty(BufWriter::new(file), &snapshot)?;
    info!(path = %path.as_ref().display(), tasks = plan.task_count(), "saved plan snapshot");
    Ok(())
}

pub fn load_plan_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Plan> {
    let file = File::open(path.as_ref())?;
    let snapshot: PlanSnapshot = serde_json::from_reader(BufReader::new(file))?;
    let plan = snapshot.into_plan()?;
    info!(path = %path.as_ref().display(), tasks = plan.task_count(), "loaded plan snapshot");
    Ok(plan)
}

/// One row of the computed task table.
#[derive(Debug, Default, Serialize, Deserialize)]
struct TaskCsvRecord {
    index: usize,
    title: String,
    indent: u32,
    summary: bool,
    #[serde(rename = "type")]
    task_type: String,
    duration: String,
    work: String,
    start: String,
    end: String,
    predecessors: String,
    resources: String,
    priority: u32,
    deadline: Option<String>,
    late: bool,
    cost: f64,
    comment: String,
}

impl From<&Task> for TaskCsvRecord {
    fn from(task: &Task) -> Self {
        if task.is_null() {
            return Self {
                index: task.index(),
                ..Self::default()
            };
        }
        Self {
            index: task.index(),
            title: task.title.clone(),
            indent: task.indent,
            summary: task.is_summary(),
            task_type: task.task_type.token().to_string(),
            duration: task.duration.to_string(),
            work: task.work.to_string(),
            start: task.start.to_string(),
            end: task.end.to_string(),
            predecessors: task.predecessors.to_string(),
            resources: task.resources.to_string(),
            priority: task.priority,
            deadline: task.deadline.map(|at| at.to_string()),
            late: task.is_late(),
            cost: task.cost,
            comment: task.comment.clone(),
        }
    }
}

/// Writes the task table with a header row; null rows keep their index
/// and leave every other column empty.
pub fn write_tasks_csv<W: Write>(plan: &Plan, writer: W) -> PersistenceResult<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for task in plan.tasks() {
        writer.serialize(TaskCsvRecord::from(task))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_tasks_to_csv<P: AsRef<Path>>(plan: &Plan, path: P) -> PersistenceResult<()> {
    write_tasks_csv(plan, File::create(path.as_ref())?)?;
    info!(path = %path.as_ref().display(), rows = plan.task_count(), "exported task table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::TimeSpan;

    #[test]
    fn csv_has_header_and_one_row_per_task() {
        let mut plan = Plan::new();
        plan.push_task(Task::new("Survey").with_duration(TimeSpan::days(2.0)))
            .expect("push");
        plan.push_task(Task::null()).expect("push");
        plan.schedule().expect("schedule");

        let mut out = Vec::new();
        write_tasks_csv(&plan, &mut out).expect("csv");
        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("index,title,indent,summary,type,duration"));
        assert!(lines[1].starts_with("0,Survey,0,false,ASAP_FDUR,2 d"));
        assert!(lines[2].starts_with("1,,0,false,,"));
    }
}
