use crate::error::FormatError;
use crate::time::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A person, crew or piece of equipment that tasks can be assigned to.
///
/// Only the tags and `available` reach scheduling, through
/// [`TaskResources::assigned_units`]. The window and calendar are kept for
/// editing and storage; nothing levels work against them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub initials: String,
    pub name: String,
    #[serde(default)]
    pub org: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub alias: String,
    /// Availability window as entered. Open-ended when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime>,
    /// Units available, e.g. 1.0 for one full-time person.
    pub available: f64,
    #[serde(default)]
    pub cost: f64,
    /// Index of the calendar this resource works to, if not the plan
    /// default. Tasks are still scheduled on the plan default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar: Option<usize>,
    #[serde(default)]
    pub comment: String,
}

impl Default for Resource {
    fn default() -> Self {
        Self {
            initials: String::new(),
            name: String::new(),
            org: String::new(),
            group: String::new(),
            role: String::new(),
            alias: String::new(),
            start: None,
            end: None,
            available: 1.0,
            cost: 0.0,
            calendar: None,
            comment: String::new(),
        }
    }
}

impl Resource {
    pub fn new(initials: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            initials: initials.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// A row with neither initials nor name is an unused placeholder.
    pub fn is_null(&self) -> bool {
        self.initials.is_empty() && self.name.is_empty()
    }

    /// The identity tags an assignment may refer to.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        [
            &self.initials,
            &self.name,
            &self.org,
            &self.group,
            &self.role,
            &self.alias,
        ]
        .into_iter()
        .map(String::as_str)
        .filter(|tag| !tag.is_empty())
    }

    pub fn matches(&self, tag: &str) -> bool {
        self.tags().any(|own| own.eq_ignore_ascii_case(tag))
    }
}

/// One `tag[max]` entry of a task's resource list.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResource {
    pub tag: String,
    pub max: Option<f64>,
}

impl fmt::Display for TaskResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)?;
        if let Some(max) = self.max {
            write!(f, "[{max}]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TaskResources(Vec<TaskResource>);

impl TaskResources {
    pub fn iter(&self) -> impl Iterator<Item = &TaskResource> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Units of work capacity the assignment resolves to. Each entry
    /// contributes the summed availability of matching resources, capped
    /// at its `max`. Falls back to 1.0 when nothing positive matches.
    pub fn assigned_units(&self, resources: &[Resource]) -> f64 {
        let total: f64 = self
            .0
            .iter()
            .map(|assignment| {
                let available: f64 = resources
                    .iter()
                    .filter(|r| !r.is_null() && r.matches(&assignment.tag))
                    .map(|r| r.available.max(0.0))
                    .sum();
                assignment.max.map_or(available, |max| available.min(max))
            })
            .sum();
        if total > 0.0 { total } else { 1.0 }
    }
}

impl fmt::Display for TaskResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(", "))
    }
}

impl FromStr for TaskResources {
    type Err = FormatError;

    /// `tag[max], tag, ...`; blank input is an empty assignment.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = Vec::new();
        for part in s.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            let (tag, max) = match part.split_once('[') {
                Some((tag, rest)) => {
                    let number = rest
                        .strip_suffix(']')
                        .ok_or_else(|| FormatError::new("resource assignment", s, "unclosed '['"))?;
                    let max: f64 = number
                        .trim()
                        .parse()
                        .map_err(|_| FormatError::new("resource assignment", s, format!("bad quantity '{number}'")))?;
                    if !max.is_finite() || max < 0.0 {
                        return Err(FormatError::new("resource assignment", s, "quantity must be non-negative"));
                    }
                    (tag.trim(), Some(max))
                }
                None => (part, None),
            };
            if tag.is_empty() || tag.contains(']') {
                return Err(FormatError::new("resource assignment", s, "missing resource tag"));
            }
            if entries.iter().any(|e: &TaskResource| e.tag.eq_ignore_ascii_case(tag)) {
                return Err(FormatError::new("resource assignment", s, format!("'{tag}' listed twice")));
            }
            entries.push(TaskResource {
                tag: tag.to_string(),
                max,
            });
        }
        Ok(Self(entries))
    }
}

impl From<TaskResources> for String {
    fn from(value: TaskResources) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for TaskResources {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
