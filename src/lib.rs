pub mod calculations;
pub mod calendar;
pub mod day;
pub mod error;
pub mod fields;
pub mod graph;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod metadata;
pub mod persistence;
pub mod plan;
pub mod predecessors;
pub mod resource;
pub mod task;
pub mod time;
pub(crate) mod validation;

pub use calendar::{Calendar, CalendarView, DEFAULT_SCAN_LIMIT};
pub use day::{Day, WorkPeriod};
pub use error::{FormatError, PlanError, PlanResult};
pub use fields::{CalendarField, DayField, ResourceField, Section, TaskField, TaskValue};
pub use graph::PlanDag;
pub use metadata::PlanMetadata;
#[cfg(feature = "sqlite")]
pub use persistence::SqlitePlanStore;
pub use persistence::{
    PersistenceError, PersistenceResult, PlanStore, export_tasks_to_csv, load_plan_from_json,
    save_plan_to_json, write_tasks_csv,
};
pub use plan::{Plan, ScheduleSummary};
pub use predecessors::{Predecessor, PredecessorResolver, PredecessorType, Predecessors};
pub use resource::{Resource, TaskResource, TaskResources};
pub use task::{Task, TaskType};
pub use time::{Date, DateTime, Interval, Time, TimeSpan, TimeUnit};
