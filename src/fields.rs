//! Section-code addressing for the editable grids.
//!
//! Every entity numbers its columns with small integers. The enums here
//! map those codes to named fields; text is read and written through the
//! same grammars the value types parse.

use crate::day::{Day, WorkPeriod};
use crate::error::{FormatError, PlanError, PlanResult};
use crate::predecessors::Predecessors;
use crate::resource::{Resource, TaskResources};
use crate::task::{MAX_PRIORITY, TaskType, check_non_negative};
use crate::time::{DateTime, TimeSpan, format_clock, parse_clock};
use std::fmt;

/// A column of one of the plan grids.
pub trait Section: Copy + Sized {
    /// Entity name used in error messages.
    const ENTITY: &'static str;

    fn from_section(section: usize) -> PlanResult<Self>;

    fn section(self) -> usize;

    fn name(self) -> &'static str;
}

fn unknown_section(entity: &str, section: usize) -> PlanError {
    PlanError::invalid(format!("{entity} has no section {section}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskField {
    Title,
    Duration,
    Start,
    End,
    Work,
    Predecessors,
    Resources,
    Type,
    Priority,
    Deadline,
    Cost,
    Comment,
}

impl TaskField {
    pub const ALL: [TaskField; 12] = [
        TaskField::Title,
        TaskField::Duration,
        TaskField::Start,
        TaskField::End,
        TaskField::Work,
        TaskField::Predecessors,
        TaskField::Resources,
        TaskField::Type,
        TaskField::Priority,
        TaskField::Deadline,
        TaskField::Cost,
        TaskField::Comment,
    ];
}

impl Section for TaskField {
    const ENTITY: &'static str = "task";

    fn from_section(section: usize) -> PlanResult<Self> {
        Self::ALL
            .get(section)
            .copied()
            .ok_or_else(|| unknown_section(Self::ENTITY, section))
    }

    fn section(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            TaskField::Title => "Title",
            TaskField::Duration => "Duration",
            TaskField::Start => "Start",
            TaskField::End => "End",
            TaskField::Work => "Work",
            TaskField::Predecessors => "Predecessors",
            TaskField::Resources => "Resources",
            TaskField::Type => "Type",
            TaskField::Priority => "Priority",
            TaskField::Deadline => "Deadline",
            TaskField::Cost => "Cost",
            TaskField::Comment => "Comment",
        }
    }
}

/// A typed task field value.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskValue {
    Title(String),
    Duration(TimeSpan),
    Start(DateTime),
    End(DateTime),
    Work(TimeSpan),
    Predecessors(Predecessors),
    Resources(TaskResources),
    Type(TaskType),
    Priority(u32),
    Deadline(Option<DateTime>),
    Cost(f64),
    Comment(String),
}

impl TaskValue {
    pub fn field(&self) -> TaskField {
        match self {
            TaskValue::Title(_) => TaskField::Title,
            TaskValue::Duration(_) => TaskField::Duration,
            TaskValue::Start(_) => TaskField::Start,
            TaskValue::End(_) => TaskField::End,
            TaskValue::Work(_) => TaskField::Work,
            TaskValue::Predecessors(_) => TaskField::Predecessors,
            TaskValue::Resources(_) => TaskField::Resources,
            TaskValue::Type(_) => TaskField::Type,
            TaskValue::Priority(_) => TaskField::Priority,
            TaskValue::Deadline(_) => TaskField::Deadline,
            TaskValue::Cost(_) => TaskField::Cost,
            TaskValue::Comment(_) => TaskField::Comment,
        }
    }

    /// Parses grid text for `field`.
    pub fn parse(field: TaskField, text: &str) -> Result<TaskValue, FormatError> {
        let trimmed = text.trim();
        Ok(match field {
            TaskField::Title => TaskValue::Title(trimmed.to_string()),
            TaskField::Duration => TaskValue::Duration(check_non_negative("duration", trimmed.parse()?)?),
            TaskField::Start => TaskValue::Start(trimmed.parse()?),
            TaskField::End => TaskValue::End(trimmed.parse()?),
            TaskField::Work => TaskValue::Work(check_non_negative("work", trimmed.parse()?)?),
            TaskField::Predecessors => TaskValue::Predecessors(trimmed.parse()?),
            TaskField::Resources => TaskValue::Resources(trimmed.parse()?),
            TaskField::Type => TaskValue::Type(trimmed.parse()?),
            TaskField::Priority => {
                let priority: u32 = trimmed
                    .parse()
                    .map_err(|_| FormatError::new("priority", text, "expected a whole number"))?;
                if priority > MAX_PRIORITY {
                    return Err(FormatError::new("priority", text, format!("must be at most {MAX_PRIORITY}")));
                }
                TaskValue::Priority(priority)
            }
            TaskField::Deadline if trimmed.is_empty() => TaskValue::Deadline(None),
            TaskField::Deadline => TaskValue::Deadline(Some(trimmed.parse()?)),
            TaskField::Cost => {
                let cost: f64 = trimmed
                    .parse()
                    .map_err(|_| FormatError::new("cost", text, "expected a number"))?;
                if !cost.is_finite() {
                    return Err(FormatError::new("cost", text, "expected a finite number"));
                }
                TaskValue::Cost(cost)
            }
            TaskField::Comment => TaskValue::Comment(text.to_string()),
        })
    }
}

impl fmt::Display for TaskValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskValue::Title(text) | TaskValue::Comment(text) => f.write_str(text),
            TaskValue::Duration(span) | TaskValue::Work(span) => write!(f, "{span}"),
            TaskValue::Start(at) | TaskValue::End(at) => write!(f, "{at}"),
            TaskValue::Predecessors(list) => write!(f, "{list}"),
            TaskValue::Resources(list) => write!(f, "{list}"),
            TaskValue::Type(task_type) => write!(f, "{task_type}"),
            TaskValue::Priority(priority) => write!(f, "{priority}"),
            TaskValue::Deadline(Some(at)) => write!(f, "{at}"),
            TaskValue::Deadline(None) => Ok(()),
            TaskValue::Cost(cost) => write!(f, "{cost}"),
        }
    }
}

/// Day columns: name, derived work, period count, then a start/end pair
/// per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayField {
    Name,
    Work,
    Periods,
    PeriodStart(usize),
    PeriodEnd(usize),
}

impl Section for DayField {
    const ENTITY: &'static str = "day";

    fn from_section(section: usize) -> PlanResult<Self> {
        Ok(match section {
            0 => DayField::Name,
            1 => DayField::Work,
            2 => DayField::Periods,
            n if (n - 3) % 2 == 0 => DayField::PeriodStart((n - 3) / 2),
            n => DayField::PeriodEnd((n - 3) / 2),
        })
    }

    fn section(self) -> usize {
        match self {
            DayField::Name => 0,
            DayField::Work => 1,
            DayField::Periods => 2,
            DayField::PeriodStart(p) => 3 + 2 * p,
            DayField::PeriodEnd(p) => 4 + 2 * p,
        }
    }

    fn name(self) -> &'static str {
        match self {
            DayField::Name => "Name",
            DayField::Work => "Work",
            DayField::Periods => "Periods",
            DayField::PeriodStart(_) => "Start",
            DayField::PeriodEnd(_) => "End",
        }
    }
}

impl Day {
    pub fn text(&self, field: DayField) -> PlanResult<String> {
        let period = |p: usize| {
            self.periods()
                .get(p)
                .copied()
                .ok_or_else(|| PlanError::invalid(format!("day '{}' has no period {p}", self.name())))
        };
        Ok(match field {
            DayField::Name => self.name().to_string(),
            DayField::Work => format!("{}", TimeSpan::days(self.work())),
            DayField::Periods => self.periods().len().to_string(),
            DayField::PeriodStart(p) => format_clock(period(p)?.start_ms()),
            DayField::PeriodEnd(p) => format_clock(period(p)?.end_ms()),
        })
    }

    /// Edits one column. A failed edit leaves the day unchanged.
    pub fn set_text(&mut self, index: usize, field: DayField, text: &str) -> PlanResult<()> {
        let cell = |source: FormatError| PlanError::field(DayField::ENTITY, index, field.name(), source);
        match field {
            DayField::Name => self.set_name(text.trim()),
            DayField::Work => return Err(PlanError::invalid("day work is derived from its periods")),
            DayField::Periods => {
                let count: usize = text
                    .trim()
                    .parse()
                    .map_err(|_| cell(FormatError::new("period count", text, "expected a whole number")))?;
                self.set_period_count(count)?;
            }
            DayField::PeriodStart(p) | DayField::PeriodEnd(p) => {
                let current = self
                    .periods()
                    .get(p)
                    .copied()
                    .ok_or_else(|| PlanError::invalid(format!("day '{}' has no period {p}", self.name())))?;
                let ms = parse_clock(text, "period time").map_err(cell)?;
                let (start, end) = match field {
                    DayField::PeriodStart(_) => (ms, current.end_ms()),
                    _ => (current.start_ms(), ms),
                };
                self.set_period(p, WorkPeriod::new(start, end)?)?;
            }
        }
        Ok(())
    }
}

/// Calendar columns: name, anchor, exception count, cycle length, then
/// one column per position of the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarField {
    Name,
    Anchor,
    Exceptions,
    CycleLength,
    Normal(usize),
}

impl Section for CalendarField {
    const ENTITY: &'static str = "calendar";

    fn from_section(section: usize) -> PlanResult<Self> {
        Ok(match section {
            0 => CalendarField::Name,
            1 => CalendarField::Anchor,
            2 => CalendarField::Exceptions,
            3 => CalendarField::CycleLength,
            n => CalendarField::Normal(n - 4),
        })
    }

    fn section(self) -> usize {
        match self {
            CalendarField::Name => 0,
            CalendarField::Anchor => 1,
            CalendarField::Exceptions => 2,
            CalendarField::CycleLength => 3,
            CalendarField::Normal(n) => 4 + n,
        }
    }

    fn name(self) -> &'static str {
        match self {
            CalendarField::Name => "Name",
            CalendarField::Anchor => "Anchor",
            CalendarField::Exceptions => "Exceptions",
            CalendarField::CycleLength => "Cycle length",
            CalendarField::Normal(_) => "Normal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceField {
    Initials,
    Name,
    Org,
    Group,
    Role,
    Alias,
    Start,
    End,
    Available,
    Cost,
    Calendar,
    Comment,
}

impl ResourceField {
    pub const ALL: [ResourceField; 12] = [
        ResourceField::Initials,
        ResourceField::Name,
        ResourceField::Org,
        ResourceField::Group,
        ResourceField::Role,
        ResourceField::Alias,
        ResourceField::Start,
        ResourceField::End,
        ResourceField::Available,
        ResourceField::Cost,
        ResourceField::Calendar,
        ResourceField::Comment,
    ];
}

impl Section for ResourceField {
    const ENTITY: &'static str = "resource";

    fn from_section(section: usize) -> PlanResult<Self> {
        Self::ALL
            .get(section)
            .copied()
            .ok_or_else(|| unknown_section(Self::ENTITY, section))
    }

    fn section(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            ResourceField::Initials => "Initials",
            ResourceField::Name => "Name",
            ResourceField::Org => "Org",
            ResourceField::Group => "Group",
            ResourceField::Role => "Role",
            ResourceField::Alias => "Alias",
            ResourceField::Start => "Start",
            ResourceField::End => "End",
            ResourceField::Available => "Available",
            ResourceField::Cost => "Cost",
            ResourceField::Calendar => "Calendar",
            ResourceField::Comment => "Comment",
        }
    }
}

fn optional_date_time(text: &str) -> Result<Option<DateTime>, FormatError> {
    match text.trim() {
        "" => Ok(None),
        trimmed => trimmed.parse().map(Some),
    }
}

impl Resource {
    /// Grid text. The calendar column holds the calendar index; the plan
    /// layer swaps it for a name.
    pub fn text(&self, field: ResourceField) -> String {
        let optional = |at: Option<DateTime>| at.map(|at| at.to_string()).unwrap_or_default();
        match field {
            ResourceField::Initials => self.initials.clone(),
            ResourceField::Name => self.name.clone(),
            ResourceField::Org => self.org.clone(),
            ResourceField::Group => self.group.clone(),
            ResourceField::Role => self.role.clone(),
            ResourceField::Alias => self.alias.clone(),
            ResourceField::Start => optional(self.start),
            ResourceField::End => optional(self.end),
            ResourceField::Available => self.available.to_string(),
            ResourceField::Cost => self.cost.to_string(),
            ResourceField::Calendar => self.calendar.map(|c| c.to_string()).unwrap_or_default(),
            ResourceField::Comment => self.comment.clone(),
        }
    }

    /// Edits one column other than the calendar. A failed edit leaves the
    /// resource unchanged.
    pub fn set_text(&mut self, index: usize, field: ResourceField, text: &str) -> PlanResult<()> {
        let cell = |source: FormatError| PlanError::field(ResourceField::ENTITY, index, field.name(), source);
        let number = |what: &'static str| -> PlanResult<f64> {
            let value: f64 = text
                .trim()
                .parse()
                .map_err(|_| cell(FormatError::new(what, text, "expected a number")))?;
            if !value.is_finite() || value < 0.0 {
                return Err(cell(FormatError::new(what, text, "must be a non-negative number")));
            }
            Ok(value)
        };
        let tag = || text.trim().to_string();
        match field {
            ResourceField::Initials => self.initials = tag(),
            ResourceField::Name => self.name = tag(),
            ResourceField::Org => self.org = tag(),
            ResourceField::Group => self.group = tag(),
            ResourceField::Role => self.role = tag(),
            ResourceField::Alias => self.alias = tag(),
            ResourceField::Start => self.start = optional_date_time(text).map_err(cell)?,
            ResourceField::End => self.end = optional_date_time(text).map_err(cell)?,
            ResourceField::Available => self.available = number("availability")?,
            ResourceField::Cost => self.cost = number("cost")?,
            ResourceField::Calendar => {
                return Err(PlanError::invalid("resource calendars are set through the plan"));
            }
            ResourceField::Comment => self.comment = text.to_string(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_sections_follow_column_order() {
        assert_eq!(TaskField::from_section(0).unwrap(), TaskField::Title);
        assert_eq!(TaskField::from_section(11).unwrap(), TaskField::Comment);
        assert_eq!(TaskField::Deadline.section(), 9);
        assert!(matches!(TaskField::from_section(12), Err(PlanError::InvalidArgument(_))));
    }

    #[test]
    fn day_and_calendar_sections_interleave_periods() {
        assert_eq!(DayField::from_section(3).unwrap(), DayField::PeriodStart(0));
        assert_eq!(DayField::from_section(6).unwrap(), DayField::PeriodEnd(1));
        assert_eq!(DayField::PeriodEnd(2).section(), 8);
        assert_eq!(CalendarField::from_section(10).unwrap(), CalendarField::Normal(6));
    }

    #[test]
    fn task_values_parse_and_display() {
        let span = TaskValue::parse(TaskField::Duration, " 2.5d ").unwrap();
        assert_eq!(span.to_string(), "2.5 d");
        assert!(TaskValue::parse(TaskField::Duration, "-1d").is_err());
        assert!(TaskValue::parse(TaskField::Priority, "1000").is_err());
        assert_eq!(TaskValue::parse(TaskField::Deadline, "").unwrap(), TaskValue::Deadline(None));
        assert_eq!(TaskValue::parse(TaskField::Type, "FIXED_PERIOD").unwrap().field(), TaskField::Type);
    }

    #[test]
    fn day_text_edits_validate_periods() {
        let mut day = Day::standard();
        assert_eq!(day.text(DayField::PeriodEnd(1)).unwrap(), "17:00");
        day.set_text(0, DayField::PeriodEnd(1), "18:30").unwrap();
        assert_eq!(day.text(DayField::Work).unwrap(), "1.19 d");
        assert!(day.set_text(0, DayField::PeriodStart(1), "11:00").is_err());
        assert!(matches!(
            day.set_text(0, DayField::PeriodStart(0), "8am"),
            Err(PlanError::Field { .. })
        ));
        assert_eq!(day.periods()[0].to_string(), "08:00-12:00");
    }

    #[test]
    fn resource_numbers_must_be_non_negative() {
        let mut resource = Resource::new("AB", "Ann");
        resource.set_text(0, ResourceField::Available, "0.5").unwrap();
        assert_eq!(resource.text(ResourceField::Available), "0.5");
        assert!(resource.set_text(0, ResourceField::Cost, "-3").is_err());
        resource.set_text(0, ResourceField::Start, "2024-02-01").unwrap();
        assert_eq!(resource.text(ResourceField::Start), "2024-02-01 00:00");
    }
}
