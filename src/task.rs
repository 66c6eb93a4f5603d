use crate::error::FormatError;
use crate::fields::{TaskField, TaskValue};
use crate::predecessors::Predecessors;
use crate::resource::TaskResources;
use crate::time::{DateTime, TimeSpan};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

pub const DEFAULT_PRIORITY: u32 = 100;
pub const MAX_PRIORITY: u32 = 999;

/// Scheduling policy of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TaskType {
    /// As soon as possible, duration given.
    #[default]
    AsapFixedDuration,
    /// As soon as possible, work given.
    AsapFixedWork,
    /// Starts on a requested date, duration given.
    StartOnFixedDuration,
    /// Starts on a requested date, work given.
    StartOnFixedWork,
    /// Start and end given.
    FixedPeriod,
}

impl TaskType {
    pub const ALL: [TaskType; 5] = [
        TaskType::AsapFixedDuration,
        TaskType::AsapFixedWork,
        TaskType::StartOnFixedDuration,
        TaskType::StartOnFixedWork,
        TaskType::FixedPeriod,
    ];

    /// Persisted token.
    pub fn token(self) -> &'static str {
        match self {
            TaskType::AsapFixedDuration => "ASAP_FDUR",
            TaskType::AsapFixedWork => "ASAP_FWORK",
            TaskType::StartOnFixedDuration => "SON_FDUR",
            TaskType::StartOnFixedWork => "SON_FWORK",
            TaskType::FixedPeriod => "FIXED_PERIOD",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskType::AsapFixedDuration => "ASAP fixed duration",
            TaskType::AsapFixedWork => "ASAP fixed work",
            TaskType::StartOnFixedDuration => "Start on fixed duration",
            TaskType::StartOnFixedWork => "Start on fixed work",
            TaskType::FixedPeriod => "Fixed period",
        }
    }

    pub fn is_start_on(self) -> bool {
        matches!(self, TaskType::StartOnFixedDuration | TaskType::StartOnFixedWork)
    }

    pub fn is_fixed_work(self) -> bool {
        matches!(self, TaskType::AsapFixedWork | TaskType::StartOnFixedWork)
    }

    pub fn is_fixed_duration(self) -> bool {
        matches!(self, TaskType::AsapFixedDuration | TaskType::StartOnFixedDuration)
    }

    /// Which fields a user may edit for this type.
    pub fn is_editable(self, field: TaskField) -> bool {
        match field {
            TaskField::Start => self.is_start_on() || self == TaskType::FixedPeriod,
            TaskField::End => self == TaskType::FixedPeriod,
            TaskField::Duration => self.is_fixed_duration(),
            TaskField::Work => self.is_fixed_work(),
            _ => true,
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskType {
    type Err = FormatError;

    /// Accepts the persisted token or the display label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.token().eq_ignore_ascii_case(text) || t.label().eq_ignore_ascii_case(text))
            .ok_or_else(|| FormatError::new("task type", s, "unknown task type"))
    }
}

/// Start and end of a task no pass has placed yet.
const UNPLACED: DateTime = DateTime::EPOCH;

/// One row of the plan. A task with an empty title is a null placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub title: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub duration: TimeSpan,
    pub work: TimeSpan,
    pub start: DateTime,
    pub end: DateTime,
    /// Requested start for start-on task types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_on: Option<DateTime>,
    #[serde(default)]
    pub predecessors: Predecessors,
    #[serde(default)]
    pub resources: TaskResources,
    pub priority: u32,
    #[serde(default)]
    pub indent: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime>,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub comment: String,

    #[serde(skip)]
    pub(crate) index: usize,
    #[serde(skip)]
    pub(crate) parent: Option<usize>,
    #[serde(skip)]
    pub(crate) summary_end: Option<usize>,
}

impl Default for Task {
    fn default() -> Self {
        Self::null()
    }
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            task_type: TaskType::default(),
            duration: TimeSpan::days(1.0),
            work: TimeSpan::days(1.0),
            start: UNPLACED,
            end: UNPLACED,
            start_on: None,
            predecessors: Predecessors::new(),
            resources: TaskResources::default(),
            priority: DEFAULT_PRIORITY,
            indent: 0,
            deadline: None,
            cost: 0.0,
            comment: String::new(),
            index: 0,
            parent: None,
            summary_end: None,
        }
    }

    pub fn null() -> Self {
        Self::new("")
    }

    pub fn with_duration(mut self, duration: TimeSpan) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Enclosing summary task, if any.
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn is_null(&self) -> bool {
        self.title.is_empty()
    }

    pub fn is_summary(&self) -> bool {
        self.summary_end.is_some()
    }

    /// Indices of the tasks this summary spans.
    pub fn summary_range(&self) -> Option<Range<usize>> {
        self.summary_end.map(|end| self.index + 1..end)
    }

    /// Zero-length span: scheduled with start equal to end.
    pub fn is_milestone(&self) -> bool {
        match self.task_type {
            TaskType::FixedPeriod => self.start == self.end,
            t if t.is_fixed_work() => self.work.is_zero(),
            _ => self.duration.is_zero(),
        }
    }

    /// Whether a scheduling pass (or the user) has given the task a time.
    pub fn is_placed(&self) -> bool {
        self.start != UNPLACED || self.end != UNPLACED
    }

    pub fn is_late(&self) -> bool {
        self.deadline.is_some_and(|deadline| self.end > deadline)
    }

    pub fn is_editable(&self, field: TaskField) -> bool {
        if self.is_null() {
            return field == TaskField::Title;
        }
        if self.is_summary()
            && matches!(
                field,
                TaskField::Duration
                    | TaskField::Start
                    | TaskField::End
                    | TaskField::Work
                    | TaskField::Type
                    | TaskField::Priority
            )
        {
            return false;
        }
        self.task_type.is_editable(field)
    }

    pub fn value(&self, field: TaskField) -> TaskValue {
        match field {
            TaskField::Title => TaskValue::Title(self.title.clone()),
            TaskField::Duration => TaskValue::Duration(self.duration),
            TaskField::Start => TaskValue::Start(self.start),
            TaskField::End => TaskValue::End(self.end),
            TaskField::Work => TaskValue::Work(self.work),
            TaskField::Predecessors => TaskValue::Predecessors(self.predecessors.clone()),
            TaskField::Resources => TaskValue::Resources(self.resources.clone()),
            TaskField::Type => TaskValue::Type(self.task_type),
            TaskField::Priority => TaskValue::Priority(self.priority),
            TaskField::Deadline => TaskValue::Deadline(self.deadline),
            TaskField::Cost => TaskValue::Cost(self.cost),
            TaskField::Comment => TaskValue::Comment(self.comment.clone()),
        }
    }

    /// Grid text for a field; blank everywhere but the title for null tasks.
    pub fn text(&self, field: TaskField) -> String {
        if self.is_null() && field != TaskField::Title {
            return String::new();
        }
        self.value(field).to_string()
    }

    /// Writes an already validated value.
    pub(crate) fn apply(&mut self, value: TaskValue) {
        match value {
            TaskValue::Title(title) => self.title = title,
            TaskValue::Duration(duration) => self.duration = duration,
            TaskValue::Start(start) => {
                if self.task_type.is_start_on() {
                    self.start_on = Some(start);
                }
                self.start = start;
            }
            TaskValue::End(end) => self.end = end,
            TaskValue::Work(work) => self.work = work,
            TaskValue::Predecessors(predecessors) => self.predecessors = predecessors,
            TaskValue::Resources(resources) => self.resources = resources,
            TaskValue::Type(task_type) => {
                if task_type.is_start_on() && self.start_on.is_none() && self.is_placed() {
                    self.start_on = Some(self.start);
                }
                self.task_type = task_type;
            }
            TaskValue::Priority(priority) => self.priority = priority,
            TaskValue::Deadline(deadline) => self.deadline = deadline,
            TaskValue::Cost(cost) => self.cost = cost,
            TaskValue::Comment(comment) => self.comment = comment,
        }
    }

    /// Span the scheduler projects: duration, or work spread over the
    /// assigned units.
    pub(crate) fn projected_span(&self, units: f64) -> TimeSpan {
        if self.task_type.is_fixed_work() {
            let units = if units > 0.0 { units } else { 1.0 };
            TimeSpan::new(self.work.num() / units, self.work.unit())
        } else {
            self.duration
        }
    }
}

/// Rejects negative spans for duration and work.
pub(crate) fn check_non_negative(what: &'static str, span: TimeSpan) -> Result<TimeSpan, FormatError> {
    if span.is_negative() {
        return Err(FormatError::new(what, span.to_string(), "must not be negative"));
    }
    Ok(span)
}
