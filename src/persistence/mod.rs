use crate::error::PlanError;
use crate::plan::Plan;
use std::io;
use thiserror::Error;

pub mod file;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{export_tasks_to_csv, load_plan_from_json, save_plan_to_json, write_tasks_csv};

#[cfg(feature = "sqlite")]
pub use sqlite::SqlitePlanStore;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("plan rejected: {0}")]
    Plan(#[from] PlanError),
    #[error("requested plan not found")]
    NotFound,
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Somewhere a whole plan can be kept between sessions.
pub trait PlanStore {
    fn save_plan(&self, plan: &Plan) -> PersistenceResult<()>;
    /// `None` when nothing has been saved yet.
    fn load_plan(&self) -> PersistenceResult<Option<Plan>>;
}
