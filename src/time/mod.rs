//! Calendar-time value types.
//!
//! `Date` counts days from 1970-01-01, `Time` counts milliseconds since
//! midnight, `DateTime` counts milliseconds from the epoch instant and
//! `TimeSpan` pairs a magnitude with a unit. chrono does the Gregorian
//! component work; the types themselves stay plain integers.

mod date;
mod datetime;
mod time_of_day;
mod timespan;

pub use date::Date;
pub use datetime::{DateTime, Interval};
pub use time_of_day::Time;
pub use timespan::{TimeSpan, TimeUnit};

pub(crate) use time_of_day::{format_clock, parse_clock};

/// Milliseconds in one calendar day.
pub const MS_PER_DAY: i64 = 86_400_000;
/// Milliseconds in one hour.
pub const MS_PER_HOUR: i64 = 3_600_000;
/// Working milliseconds that make up one "work day" of effort.
pub const WORK_DAY_MS: i64 = 8 * MS_PER_HOUR;
