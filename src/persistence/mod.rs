use crate::task::{Task, TaskId};
use chrono::NaiveDate;
use serde_json::Error as SerdeJsonError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Durable home for tasks. A successful `insert`, `update_by_id` or
/// `delete_by_id` must be visible to later `find_by_date` calls from the
/// same process.
pub trait TaskRepository: Send + Sync {
    fn find_by_date(&self, date: NaiveDate) -> PersistenceResult<Vec<Task>>;
    fn find_by_id(&self, id: TaskId) -> PersistenceResult<Option<Task>>;
    fn insert(&self, task: &Task) -> PersistenceResult<()>;
    /// Overwrites the stored fields of `id`; `false` if no such task exists.
    fn update_by_id(&self, id: TaskId, task: &Task) -> PersistenceResult<bool>;
    /// `false` if no such task exists.
    fn delete_by_id(&self, id: TaskId) -> PersistenceResult<bool>;
}

pub mod file;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{export_day_to_csv, load_tasks_from_json, save_tasks_to_json};
