pub mod summary;
pub mod task_schedule;

pub use summary::summarize;
pub use task_schedule::{TaskScheduler, Timing};
