use crate::persistence::PersistenceError;
use crate::task::{Task, TaskId};
use crate::task_validation::ValidationErrors;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    /// A valid request that collides with other tasks on the same date.
    /// Nothing was applied; repeat with the override flag to force it.
    #[error("task overlaps {} existing task(s)", overlaps.len())]
    Conflict { overlaps: Vec<Task> },
    #[error("task {0} not found")]
    NotFound(TaskId),
    #[error("task {0} already exists")]
    DuplicateId(TaskId),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
