use crate::calculations::{TaskScheduler, Timing, summarize};
use crate::calendar::{Calendar, CalendarView};
use crate::day::Day;
use crate::error::{FormatError, PlanError, PlanResult};
use crate::fields::{CalendarField, DayField, ResourceField, Section, TaskField, TaskValue};
use crate::graph::PlanDag;
use crate::metadata::PlanMetadata;
use crate::resource::Resource;
use crate::task::Task;
use crate::validation::{validate_calendar, validate_predecessors, validate_task};
use crate::time::{Date, DateTime};
use serde::Serialize;
use std::cmp::Ordering;

/// What a scheduling pass produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleSummary {
    pub task_count: usize,
    pub summary_count: usize,
    pub milestone_count: usize,
    pub late_tasks: Vec<usize>,
    pub start: Option<DateTime>,
    pub finish: Option<DateTime>,
}

impl ScheduleSummary {
    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("tasks={}", self.task_count));
        if self.summary_count > 0 {
            parts.push(format!("summaries={}", self.summary_count));
        }
        if self.milestone_count > 0 {
            parts.push(format!("milestones={}", self.milestone_count));
        }
        if let Some(start) = self.start {
            parts.push(format!("start={start}"));
        }
        if let Some(finish) = self.finish {
            parts.push(format!("finish={finish}"));
        }
        if !self.late_tasks.is_empty() {
            let late = self
                .late_tasks
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            parts.push(format!("late={late}"));
        }
        parts.join(", ")
    }
}

/// The whole planning model: tasks, day-types, calendars and resources.
/// Cross references are indices into these lists.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    metadata: PlanMetadata,
    days: Vec<Day>,
    calendars: Vec<Calendar>,
    tasks: Vec<Task>,
    resources: Vec<Resource>,
}

impl Default for Plan {
    fn default() -> Self {
        Self::new()
    }
}

impl Plan {
    /// An empty plan with the built-in days and calendars.
    pub fn new() -> Self {
        Self {
            metadata: PlanMetadata::default(),
            days: Day::builtins(),
            calendars: Calendar::builtins(),
            tasks: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Assembles a plan from loaded parts, checking every cross reference.
    pub fn from_parts(
        metadata: PlanMetadata,
        days: Vec<Day>,
        calendars: Vec<Calendar>,
        tasks: Vec<Task>,
        resources: Vec<Resource>,
    ) -> PlanResult<Self> {
        for calendar in &calendars {
            validate_calendar(calendar, days.len())?;
        }
        if metadata.default_calendar >= calendars.len() {
            return Err(PlanError::invalid(format!(
                "default calendar {} does not exist",
                metadata.default_calendar
            )));
        }
        for (i, resource) in resources.iter().enumerate() {
            if let Some(calendar) = resource.calendar.filter(|c| *c >= calendars.len()) {
                return Err(PlanError::invalid(format!(
                    "resource {i} uses missing calendar {calendar}"
                )));
            }
        }
        for (i, task) in tasks.iter().enumerate() {
            validate_task(i, task)?;
            validate_predecessors(i, &task.predecessors, tasks.len())
                .map_err(|err| PlanError::field(TaskField::ENTITY, i, TaskField::Predecessors.name(), err))?;
        }

        let mut plan = Self {
            metadata,
            days,
            calendars,
            tasks,
            resources,
        };
        plan.refresh_structure();
        Ok(plan)
    }

    pub fn metadata(&self) -> &PlanMetadata {
        &self.metadata
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.metadata.title = title.into();
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.metadata.notes = notes.into();
    }

    pub fn default_start(&self) -> DateTime {
        self.metadata.default_start
    }

    pub fn set_default_start(&mut self, start: DateTime) {
        self.metadata.default_start = start;
    }

    pub fn default_calendar(&self) -> usize {
        self.metadata.default_calendar
    }

    pub fn set_default_calendar(&mut self, index: usize) -> PlanResult<()> {
        if index >= self.calendars.len() {
            return Err(PlanError::invalid(format!("calendar {index} does not exist")));
        }
        self.metadata.default_calendar = index;
        Ok(())
    }

    pub fn set_scan_limit(&mut self, days: u32) {
        self.metadata.scan_limit = days;
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn days(&self) -> &[Day] {
        &self.days
    }

    pub fn day(&self, index: usize) -> Option<&Day> {
        self.days.get(index)
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn calendars(&self) -> &[Calendar] {
        &self.calendars
    }

    pub fn calendar(&self, index: usize) -> Option<&Calendar> {
        self.calendars.get(index)
    }

    pub fn calendar_count(&self) -> usize {
        self.calendars.len()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn resource(&self, index: usize) -> Option<&Resource> {
        self.resources.get(index)
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    fn task_index(&self, index: usize) -> PlanResult<usize> {
        if index < self.tasks.len() {
            Ok(index)
        } else {
            Err(PlanError::invalid(format!("task {index} does not exist")))
        }
    }

    /// Appends a task and returns its index.
    pub fn push_task(&mut self, task: Task) -> PlanResult<usize> {
        let at = self.tasks.len();
        self.insert_task(at, task)?;
        Ok(at)
    }

    /// Inserts before `at`. The new task's predecessor indices refer to the
    /// list after insertion.
    pub fn insert_task(&mut self, at: usize, task: Task) -> PlanResult<()> {
        if at > self.tasks.len() {
            return Err(PlanError::invalid(format!("cannot insert at {at} into {} tasks", self.tasks.len())));
        }
        validate_task(at, &task)?;
        validate_predecessors(at, &task.predecessors, self.tasks.len() + 1)
            .map_err(|err| PlanError::field(TaskField::ENTITY, at, TaskField::Predecessors.name(), err))?;
        self.remap_task_references(|i| Some(if i >= at { i + 1 } else { i }));
        self.tasks.insert(at, task);
        self.refresh_structure();
        Ok(())
    }

    /// Removes a task; references to it are dropped and later indices shift
    /// down.
    pub fn remove_task(&mut self, at: usize) -> PlanResult<Task> {
        self.task_index(at)?;
        let removed = self.tasks.remove(at);
        self.remap_task_references(|i| match i.cmp(&at) {
            Ordering::Less => Some(i),
            Ordering::Equal => None,
            Ordering::Greater => Some(i - 1),
        });
        self.refresh_structure();
        Ok(removed)
    }

    pub fn move_task(&mut self, from: usize, to: usize) -> PlanResult<()> {
        self.task_index(from)?;
        self.task_index(to)?;
        if from == to {
            return Ok(());
        }
        let task = self.tasks.remove(from);
        self.tasks.insert(to, task);
        self.remap_task_references(|i| {
            Some(if i == from {
                to
            } else if from < to && (from + 1..=to).contains(&i) {
                i - 1
            } else if to < from && (to..from).contains(&i) {
                i + 1
            } else {
                i
            })
        });
        self.refresh_structure();
        Ok(())
    }

    /// Nests a task one level deeper, under the task above it.
    pub fn indent_task(&mut self, index: usize) -> PlanResult<()> {
        self.task_index(index)?;
        let above = index
            .checked_sub(1)
            .map(|i| self.tasks[i].indent)
            .ok_or_else(|| PlanError::invalid("the first task cannot be indented"))?;
        if self.tasks[index].indent > above {
            return Err(PlanError::invalid(format!("task {index} is already nested under task {}", index - 1)));
        }
        self.tasks[index].indent += 1;
        self.refresh_structure();
        Ok(())
    }

    pub fn outdent_task(&mut self, index: usize) -> PlanResult<()> {
        self.task_index(index)?;
        if self.tasks[index].indent == 0 {
            return Err(PlanError::invalid(format!("task {index} is not indented")));
        }
        self.tasks[index].indent -= 1;
        self.refresh_structure();
        Ok(())
    }

    fn remap_task_references(&mut self, map: impl Fn(usize) -> Option<usize>) {
        for task in &mut self.tasks {
            task.predecessors.remap(&map);
        }
    }

    /// Recomputes stored indices, parents and summary ranges from the
    /// indent levels. Indents deeper than one below the task above are
    /// pulled back.
    fn refresh_structure(&mut self) {
        let count = self.tasks.len();
        let mut previous: Option<u32> = None;
        for (i, task) in self.tasks.iter_mut().enumerate() {
            task.index = i;
            task.parent = None;
            task.summary_end = None;
            let deepest = previous.map_or(0, |p| p + 1);
            if task.indent > deepest {
                tracing::debug!(task = i, indent = task.indent, deepest, "clamping indent");
                task.indent = deepest;
            }
            previous = Some(task.indent);
        }

        let mut open: Vec<usize> = Vec::new();
        for i in 0..=count {
            let indent = self.tasks.get(i).map(|t| t.indent);
            while let Some(&top) = open.last() {
                if indent.is_some_and(|indent| self.tasks[top].indent < indent) {
                    break;
                }
                open.pop();
                if i > top + 1 {
                    self.tasks[top].summary_end = Some(i);
                }
            }
            if i < count {
                self.tasks[i].parent = open.last().copied();
                open.push(i);
            }
        }
    }

    pub fn is_task_editable(&self, index: usize, field: TaskField) -> bool {
        self.tasks.get(index).is_some_and(|t| t.is_editable(field))
    }

    pub fn task_value(&self, index: usize, field: TaskField) -> PlanResult<TaskValue> {
        Ok(self.tasks[self.task_index(index)?].value(field))
    }

    /// Validates and writes one task field. Nothing changes on error.
    pub fn set_task_value(&mut self, index: usize, value: TaskValue) -> PlanResult<()> {
        self.task_index(index)?;
        let field = value.field();
        if !self.tasks[index].is_editable(field) {
            return Err(PlanError::invalid(format!("task {index} {} is not editable", field.name())));
        }
        let cell = |err: FormatError| PlanError::field(TaskField::ENTITY, index, field.name(), err);
        match &value {
            TaskValue::Predecessors(list) => {
                validate_predecessors(index, list, self.tasks.len()).map_err(cell)?;
            }
            TaskValue::Duration(span) | TaskValue::Work(span) if span.is_negative() => {
                return Err(cell(FormatError::new("time span", span.to_string(), "must not be negative")));
            }
            TaskValue::Cost(cost) if !cost.is_finite() => {
                return Err(cell(FormatError::new("cost", cost.to_string(), "expected a finite number")));
            }
            TaskValue::Type(kind) if kind.is_start_on() => {
                let task = &mut self.tasks[index];
                if task.start_on.is_none() && !task.is_placed() {
                    task.start_on = Some(self.metadata.default_start);
                }
            }
            _ => {}
        }
        self.tasks[index].apply(value);
        Ok(())
    }

    pub fn task_text(&self, index: usize, section: usize) -> PlanResult<String> {
        let field = TaskField::from_section(section)?;
        Ok(self.tasks[self.task_index(index)?].text(field))
    }

    pub fn set_task_text(&mut self, index: usize, section: usize, text: &str) -> PlanResult<()> {
        let field = TaskField::from_section(section)?;
        let value = TaskValue::parse(field, text)
            .map_err(|err| PlanError::field(TaskField::ENTITY, index, field.name(), err))?;
        self.set_task_value(index, value)
    }

    pub fn add_day(&mut self, day: Day) -> usize {
        self.days.push(day);
        self.days.len() - 1
    }

    pub fn day_text(&self, index: usize, section: usize) -> PlanResult<String> {
        let day = self
            .days
            .get(index)
            .ok_or_else(|| PlanError::invalid(format!("day {index} does not exist")))?;
        day.text(DayField::from_section(section)?)
    }

    pub fn set_day_text(&mut self, index: usize, section: usize, text: &str) -> PlanResult<()> {
        let field = DayField::from_section(section)?;
        let mut day = self
            .days
            .get(index)
            .cloned()
            .ok_or_else(|| PlanError::invalid(format!("day {index} does not exist")))?;
        day.set_text(index, field, text)?;
        self.days[index] = day;
        Ok(())
    }

    pub fn add_calendar(&mut self, calendar: Calendar) -> PlanResult<usize> {
        validate_calendar(&calendar, self.days.len())?;
        self.calendars.push(calendar);
        Ok(self.calendars.len() - 1)
    }

    fn calendar_index(&self, index: usize) -> PlanResult<usize> {
        if index < self.calendars.len() {
            Ok(index)
        } else {
            Err(PlanError::invalid(format!("calendar {index} does not exist")))
        }
    }

    /// Day index from a name (case-insensitive) or a bare number.
    fn find_day(&self, text: &str) -> Option<usize> {
        let text = text.trim();
        self.days
            .iter()
            .position(|d| d.name().eq_ignore_ascii_case(text))
            .or_else(|| text.parse().ok().filter(|i| *i < self.days.len()))
    }

    fn find_calendar(&self, text: &str) -> Option<usize> {
        let text = text.trim();
        self.calendars
            .iter()
            .position(|c| c.name().eq_ignore_ascii_case(text))
            .or_else(|| text.parse().ok().filter(|i| *i < self.calendars.len()))
    }

    pub fn calendar_text(&self, index: usize, section: usize) -> PlanResult<String> {
        let calendar = &self.calendars[self.calendar_index(index)?];
        Ok(match CalendarField::from_section(section)? {
            CalendarField::Name => calendar.name().to_string(),
            CalendarField::Anchor => calendar.anchor().to_string(),
            CalendarField::Exceptions => calendar.exceptions().len().to_string(),
            CalendarField::CycleLength => calendar.cycle_length().to_string(),
            CalendarField::Normal(n) => {
                let day = calendar.normal_day(n).ok_or_else(|| {
                    PlanError::invalid(format!("calendar '{}' has no cycle position {n}", calendar.name()))
                })?;
                self.days[day].name().to_string()
            }
        })
    }

    pub fn set_calendar_text(&mut self, index: usize, section: usize, text: &str) -> PlanResult<()> {
        self.calendar_index(index)?;
        let field = CalendarField::from_section(section)?;
        let cell = |err: FormatError| PlanError::field(CalendarField::ENTITY, index, field.name(), err);
        let mut calendar = self.calendars[index].clone();
        match field {
            CalendarField::Name => calendar.set_name(text.trim()),
            CalendarField::Anchor => calendar.set_anchor(text.parse::<Date>().map_err(cell)?),
            CalendarField::Exceptions => {
                return Err(PlanError::invalid("exceptions are edited one date at a time"));
            }
            CalendarField::CycleLength => {
                let length: usize = text
                    .trim()
                    .parse()
                    .map_err(|_| cell(FormatError::new("cycle length", text, "expected a whole number")))?;
                calendar.set_cycle_length(length)?;
            }
            CalendarField::Normal(n) => {
                let day = self
                    .find_day(text)
                    .ok_or_else(|| cell(FormatError::new("day", text, "no such day")))?;
                calendar.set_normal_day(n, day)?;
            }
        }
        self.calendars[index] = calendar;
        Ok(())
    }

    /// Sets or clears the day used by a calendar on one date.
    pub fn set_calendar_exception(&mut self, index: usize, date: Date, day: Option<usize>) -> PlanResult<()> {
        self.calendar_index(index)?;
        if let Some(day) = day.filter(|d| *d >= self.days.len()) {
            return Err(PlanError::invalid(format!("day {day} does not exist")));
        }
        self.calendars[index].set_exception(date, day);
        Ok(())
    }

    pub fn add_resource(&mut self, resource: Resource) -> PlanResult<usize> {
        if let Some(calendar) = resource.calendar {
            self.calendar_index(calendar)?;
        }
        self.resources.push(resource);
        Ok(self.resources.len() - 1)
    }

    fn resource_index(&self, index: usize) -> PlanResult<usize> {
        if index < self.resources.len() {
            Ok(index)
        } else {
            Err(PlanError::invalid(format!("resource {index} does not exist")))
        }
    }

    pub fn resource_text(&self, index: usize, section: usize) -> PlanResult<String> {
        let resource = &self.resources[self.resource_index(index)?];
        Ok(match ResourceField::from_section(section)? {
            ResourceField::Calendar => resource
                .calendar
                .and_then(|c| self.calendars.get(c))
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            field => resource.text(field),
        })
    }

    pub fn set_resource_text(&mut self, index: usize, section: usize, text: &str) -> PlanResult<()> {
        self.resource_index(index)?;
        match ResourceField::from_section(section)? {
            ResourceField::Calendar if text.trim().is_empty() => self.resources[index].calendar = None,
            ResourceField::Calendar => {
                let calendar = self.find_calendar(text).ok_or_else(|| {
                    PlanError::field(
                        ResourceField::ENTITY,
                        index,
                        ResourceField::Calendar.name(),
                        FormatError::new("calendar", text, "no such calendar"),
                    )
                })?;
                self.resources[index].calendar = Some(calendar);
            }
            field => {
                let mut resource = self.resources[index].clone();
                resource.set_text(index, field, text)?;
                self.resources[index] = resource;
            }
        }
        Ok(())
    }

    pub fn calendar_view(&self, index: usize) -> PlanResult<CalendarView<'_>> {
        let calendar = &self.calendars[self.calendar_index(index)?];
        CalendarView::new(calendar, &self.days, self.metadata.scan_limit)
    }

    pub fn default_calendar_view(&self) -> PlanResult<CalendarView<'_>> {
        self.calendar_view(self.metadata.default_calendar)
    }

    pub fn dag(&self) -> PlanDag {
        PlanDag::build(&self.tasks)
    }

    /// Task indices in the order a scheduling pass visits them.
    pub fn scheduling_order(&self) -> PlanResult<Vec<usize>> {
        self.dag().scheduling_order()
    }

    /// Orders two tasks the way a scheduling pass would: a task that must
    /// come first (directly or through a summary) sorts before its
    /// dependent, then higher priority, then lower index.
    pub fn compare_tasks(&self, a: usize, b: usize) -> PlanResult<Ordering> {
        self.task_index(a)?;
        self.task_index(b)?;
        Ok(self.dag().compare(a, b))
    }

    /// Resource capacity assigned to a task (1.0 when unassigned).
    pub fn assigned_units(&self, index: usize) -> PlanResult<f64> {
        Ok(self.tasks[self.task_index(index)?].resources.assigned_units(&self.resources))
    }

    pub fn late_tasks(&self) -> Vec<usize> {
        self.tasks
            .iter()
            .filter(|t| !t.is_null() && t.is_late())
            .map(Task::index)
            .collect()
    }

    /// Recomputes every task's start, end, duration and work. Either the
    /// whole pass succeeds and is committed, or the plan is left as it was.
    pub fn schedule(&mut self) -> PlanResult<ScheduleSummary> {
        match self.compute_schedule() {
            Ok((tasks, summary)) => {
                self.tasks = tasks;
                tracing::info!(summary = %summary.to_cli_summary(), "schedule pass complete");
                Ok(summary)
            }
            Err(err) => {
                tracing::warn!(error = %err, "schedule pass aborted");
                Err(err)
            }
        }
    }

    fn compute_schedule(&self) -> PlanResult<(Vec<Task>, ScheduleSummary)> {
        let order = self.scheduling_order()?;
        let calendar = self.default_calendar_view()?;
        let mut tasks = self.tasks.clone();

        for index in order {
            if tasks[index].is_null() {
                continue;
            }
            let timing: Timing = if tasks[index].is_summary() {
                match summarize(&tasks, index, &calendar) {
                    Some(timing) => timing,
                    None => continue,
                }
            } else {
                let units = tasks[index].resources.assigned_units(&self.resources);
                TaskScheduler::new(&tasks, calendar, self.metadata.default_start).schedule(index, units)?
            };
            tracing::debug!(task = index, start = %timing.start, end = %timing.end, "placed task");
            let task = &mut tasks[index];
            task.start = timing.start;
            task.end = timing.end;
            task.duration = timing.duration;
            task.work = timing.work;
        }

        let live: Vec<&Task> = tasks.iter().filter(|t| !t.is_null()).collect();
        let summary = ScheduleSummary {
            task_count: live.len(),
            summary_count: live.iter().filter(|t| t.is_summary()).count(),
            milestone_count: live.iter().filter(|t| !t.is_summary() && t.start == t.end).count(),
            late_tasks: live.iter().filter(|t| t.is_late()).map(|t| t.index()).collect(),
            start: live.iter().map(|t| t.start).min(),
            finish: live.iter().map(|t| t.end).max(),
        };
        Ok((tasks, summary))
    }
}
