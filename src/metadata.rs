use crate::calendar::DEFAULT_SCAN_LIMIT;
use crate::time::{Date, DateTime, Time};
use serde::{Deserialize, Serialize};

/// Plan-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub title: String,
    #[serde(default)]
    pub notes: String,
    /// Where tasks without constraints start.
    pub default_start: DateTime,
    /// Index of the calendar used for scheduling.
    #[serde(default)]
    pub default_calendar: usize,
    /// How many consecutive non-working days a working-time search may
    /// cross before giving up.
    #[serde(default = "default_scan_limit")]
    pub scan_limit: u32,
}

fn default_scan_limit() -> u32 {
    DEFAULT_SCAN_LIMIT
}

impl Default for PlanMetadata {
    fn default() -> Self {
        let start = Date::from_ymd_opt(2025, 1, 6)
            .zip(Time::from_hms_opt(8, 0, 0))
            .map(|(date, time)| DateTime::new(date, time))
            .unwrap_or(DateTime::from_milliseconds(0));
        Self {
            title: "New Plan".to_string(),
            notes: String::new(),
            default_start: start,
            default_calendar: 0,
            scan_limit: DEFAULT_SCAN_LIMIT,
        }
    }
}
