pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod layout;
pub mod overlap;
pub mod persistence;
pub mod service;
pub mod store;
pub mod task;
pub mod task_validation;
pub mod time;

pub use clock::ClockConfig;
pub use config::{ConfigError, PlannerConfig};
pub use engine::{Revision, SchedulingEngine};
pub use error::{ScheduleError, ScheduleResult};
pub use layout::TaskPlacement;
pub use overlap::{Candidate, TimeRange, find_overlaps};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteTaskRepository;
pub use persistence::{
    PersistenceError, TaskRepository, export_day_to_csv, load_tasks_from_json, save_tasks_to_json,
};
pub use service::TaskService;
pub use store::{DailyTaskStore, RankedTask};
pub use task::{DEFAULT_COLOR, Task, TaskDraft, TaskId, TaskPatch};
pub use task_validation::ValidationErrors;
pub use time::{TimeError, TimeOfDay};
