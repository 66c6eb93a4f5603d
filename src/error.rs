use crate::time::DateTime;
use thiserror::Error;

/// A string handed to one of the text grammars (dates, times, spans,
/// predecessor lists, resource assignments) could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {what} '{input}': {reason}")]
pub struct FormatError {
    pub what: &'static str,
    pub input: String,
    pub reason: String,
}

impl FormatError {
    pub fn new(what: &'static str, input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            what,
            input: input.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error(transparent)]
    Format(#[from] FormatError),

    /// A validation failure tied to the grid cell that produced it.
    #[error("{entity} {index} {field}: {source}")]
    Field {
        entity: &'static str,
        index: usize,
        field: &'static str,
        #[source]
        source: FormatError,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("calendar '{calendar}' has no working time reachable from {from}")]
    NoWorkingTime { calendar: String, from: DateTime },

    #[error("{span} from {from} reaches beyond the supported date range")]
    SpanOutOfRange { span: String, from: DateTime },

    #[error("cyclic predecessors between tasks {}", join_indices(.tasks))]
    CyclicPredecessors { tasks: Vec<usize> },
}

impl PlanError {
    pub fn invalid(message: impl Into<String>) -> Self {
        PlanError::InvalidArgument(message.into())
    }

    pub fn field(
        entity: &'static str,
        index: usize,
        field: &'static str,
        source: FormatError,
    ) -> Self {
        PlanError::Field {
            entity,
            index,
            field,
            source,
        }
    }

    /// True for errors a user can fix by editing input, as opposed to
    /// programming errors such as an unknown section code.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, PlanError::InvalidArgument(_))
    }
}

fn join_indices(tasks: &[usize]) -> String {
    tasks
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type PlanResult<T> = Result<T, PlanError>;
