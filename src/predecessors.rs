use crate::calendar::CalendarView;
use crate::error::{FormatError, PlanError, PlanResult};
use crate::task::Task;
use crate::time::{DateTime, TimeSpan};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredecessorType {
    FinishStart,
    StartStart,
    FinishFinish,
    StartFinish,
}

impl PredecessorType {
    pub const ALL: [PredecessorType; 4] = [
        PredecessorType::FinishStart,
        PredecessorType::StartStart,
        PredecessorType::FinishFinish,
        PredecessorType::StartFinish,
    ];

    pub fn token(self) -> &'static str {
        match self {
            PredecessorType::FinishStart => "FS",
            PredecessorType::StartStart => "SS",
            PredecessorType::FinishFinish => "FF",
            PredecessorType::StartFinish => "SF",
        }
    }

    /// FS and SS limit when the dependent task may start; FF and SF limit
    /// when it may finish.
    pub fn constrains_start(self) -> bool {
        matches!(self, PredecessorType::FinishStart | PredecessorType::StartStart)
    }

    /// Whether the predecessor's finish (rather than its start) is the
    /// reference point.
    pub fn from_finish(self) -> bool {
        matches!(self, PredecessorType::FinishStart | PredecessorType::FinishFinish)
    }
}

impl fmt::Display for PredecessorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for PredecessorType {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.token().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FormatError::new("predecessor type", s, "expected FS, SS, FF or SF"))
    }
}

/// A dependency on another task, by index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Predecessor {
    pub task: usize,
    pub kind: PredecessorType,
    pub lag: Option<TimeSpan>,
}

impl Predecessor {
    pub fn finish_start(task: usize) -> Self {
        Self {
            task,
            kind: PredecessorType::FinishStart,
            lag: None,
        }
    }

    pub fn with_kind(mut self, kind: PredecessorType) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_lag(mut self, lag: TimeSpan) -> Self {
        self.lag = (!lag.is_zero()).then_some(lag);
        self
    }
}

impl fmt::Display for Predecessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.task)?;
        if self.kind != PredecessorType::FinishStart {
            f.write_str(self.kind.token())?;
        }
        if let Some(lag) = self.lag {
            if lag.is_negative() {
                f.write_str(&lag.compact())?;
            } else {
                write!(f, "+{}", lag.compact())?;
            }
        }
        Ok(())
    }
}

impl FromStr for Predecessor {
    type Err = FormatError;

    /// `<index>[FS|SS|FF|SF][+lag|-lag]`, e.g. `3`, `3SS`, `4FF-1d`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let digits = text.find(|c: char| !c.is_ascii_digit()).unwrap_or(text.len());
        if digits == 0 {
            return Err(FormatError::new("predecessor", s, "must start with a task index"));
        }
        let task = text[..digits]
            .parse()
            .map_err(|_| FormatError::new("predecessor", s, "task index out of range"))?;

        let rest = text[digits..].trim_start();
        let lag_at = rest.find(['+', '-']).unwrap_or(rest.len());
        let (kind_text, lag_text) = rest.split_at(lag_at);
        let kind = match kind_text.trim() {
            "" => PredecessorType::FinishStart,
            token => token.parse().map_err(|err: FormatError| FormatError::new("predecessor", s, err.reason))?,
        };
        let lag = match lag_text.trim() {
            "" => None,
            lag => {
                let span: TimeSpan = lag
                    .parse()
                    .map_err(|err: FormatError| FormatError::new("predecessor", s, err.reason))?;
                (!span.is_zero()).then_some(span)
            }
        };
        Ok(Self { task, kind, lag })
    }
}

/// A task's dependency list. Order is kept for display only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Predecessors(Vec<Predecessor>);

impl Predecessors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Predecessor> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains_task(&self, task: usize) -> bool {
        self.0.iter().any(|p| p.task == task)
    }

    pub fn push(&mut self, predecessor: Predecessor) -> PlanResult<()> {
        if self.contains_task(predecessor.task) {
            return Err(PlanError::invalid(format!(
                "task {} is already a predecessor",
                predecessor.task
            )));
        }
        self.0.push(predecessor);
        Ok(())
    }

    /// Renumbers references; entries mapped to `None` are dropped.
    pub(crate) fn remap(&mut self, map: impl Fn(usize) -> Option<usize>) {
        self.0.retain_mut(|p| match map(p.task) {
            Some(task) => {
                p.task = task;
                true
            }
            None => false,
        });
    }
}

impl<'a> IntoIterator for &'a Predecessors {
    type Item = &'a Predecessor;
    type IntoIter = std::slice::Iter<'a, Predecessor>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Predecessors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, predecessor) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{predecessor}")?;
        }
        Ok(())
    }
}

impl FromStr for Predecessors {
    type Err = FormatError;

    /// Comma separated [`Predecessor`] entries; blank input is an empty list.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut list = Vec::new();
        for part in s.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            let predecessor: Predecessor = part.parse()?;
            if list.iter().any(|p: &Predecessor| p.task == predecessor.task) {
                return Err(FormatError::new(
                    "predecessors",
                    s,
                    format!("task {} listed twice", predecessor.task),
                ));
            }
            list.push(predecessor);
        }
        Ok(Self(list))
    }
}

impl From<Predecessors> for String {
    fn from(value: Predecessors) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Predecessors {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Turns predecessor lists into start and finish limits.
///
/// Reads the current start/end of referenced tasks, so those must already
/// be scheduled. References to null or missing tasks are ignored.
pub struct PredecessorResolver<'a> {
    tasks: &'a [Task],
    calendar: CalendarView<'a>,
}

impl<'a> PredecessorResolver<'a> {
    pub fn new(tasks: &'a [Task], calendar: CalendarView<'a>) -> Self {
        Self { tasks, calendar }
    }

    fn live(&self, task: &'a Task) -> impl Iterator<Item = (&'a Predecessor, &'a Task)> + use<'a> {
        let tasks = self.tasks;
        task.predecessors
            .iter()
            .filter_map(move |p| tasks.get(p.task).filter(|t| !t.is_null()).map(|t| (p, t)))
    }

    pub fn has_to_start(&self, task: &'a Task) -> bool {
        self.live(task).any(|(p, _)| p.kind.constrains_start())
    }

    pub fn has_to_finish(&self, task: &'a Task) -> bool {
        self.live(task).any(|(p, _)| !p.kind.constrains_start())
    }

    fn implied(&self, predecessor: &Predecessor, other: &Task) -> PlanResult<DateTime> {
        let base = if predecessor.kind.from_finish() {
            other.end
        } else {
            other.start
        };
        match predecessor.lag {
            Some(lag) => self.calendar.work_time_span(base, lag),
            None => Ok(base),
        }
    }

    fn latest(&self, task: &'a Task, start_side: bool) -> PlanResult<Option<DateTime>> {
        let mut latest: Option<DateTime> = None;
        for (predecessor, other) in self.live(task) {
            if predecessor.kind.constrains_start() != start_side {
                continue;
            }
            let at = self.implied(predecessor, other)?;
            latest = Some(latest.map_or(at, |current| current.max(at)));
        }
        Ok(latest)
    }

    /// Earliest start allowed by FS/SS predecessors.
    pub fn start(&self, task: &'a Task) -> PlanResult<Option<DateTime>> {
        self.latest(task, true)
    }

    /// Finish limit from FF/SF predecessors: the latest implied finish.
    pub fn end(&self, task: &'a Task) -> PlanResult<Option<DateTime>> {
        self.latest(task, false)
    }

    /// Start limit of the task or, failing that, of the nearest enclosing
    /// summary that has one.
    pub fn inherited_start(&self, index: usize) -> PlanResult<Option<DateTime>> {
        let mut current = self.tasks.get(index);
        while let Some(task) = current {
            if self.has_to_start(task) {
                return self.start(task);
            }
            current = task.parent().and_then(|parent| self.tasks.get(parent));
        }
        Ok(None)
    }

    pub fn inherited_end(&self, index: usize) -> PlanResult<Option<DateTime>> {
        let mut current = self.tasks.get(index);
        while let Some(task) = current {
            if self.has_to_finish(task) {
                return self.end(task);
            }
            current = task.parent().and_then(|parent| self.tasks.get(parent));
        }
        Ok(None)
    }
}
