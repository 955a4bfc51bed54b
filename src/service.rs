//! The scheduling engine backed by an optional [`TaskRepository`].
//!
//! Dates are hydrated from the repository the first time they are touched.
//! Mutations are decided in memory by the engine (under its per-date lock)
//! and written through afterwards; a failed write is compensated in memory
//! and the storage error is returned unchanged.

use crate::clock::ClockConfig;
use crate::engine::{Revision, SchedulingEngine};
use crate::error::{ScheduleError, ScheduleResult};
use crate::layout::TaskPlacement;
use crate::persistence::{PersistenceError, TaskRepository};
use crate::task::{Task, TaskDraft, TaskId, TaskPatch};
use crate::task_validation::DATE_FORMAT;
use crate::time::TimeOfDay;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct TaskService {
    engine: SchedulingEngine,
    repository: Option<Arc<dyn TaskRepository>>,
    /// One flag per date, locked for the whole hydration of that date.
    hydration: Mutex<HashMap<NaiveDate, Arc<Mutex<bool>>>>,
}

impl TaskService {
    /// A service whose tasks live only as long as the process.
    pub fn in_memory(clock: ClockConfig) -> Self {
        Self {
            engine: SchedulingEngine::new().with_clock(clock),
            repository: None,
            hydration: Mutex::new(HashMap::new()),
        }
    }

    /// Wraps an engine that was populated elsewhere, e.g. from a snapshot.
    pub fn from_engine(engine: SchedulingEngine) -> Self {
        Self {
            engine,
            repository: None,
            hydration: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_repository(clock: ClockConfig, repository: Arc<dyn TaskRepository>) -> Self {
        Self {
            repository: Some(repository),
            ..Self::in_memory(clock)
        }
    }

    /// SQLite-backed when `database_path` is given, in-memory otherwise.
    pub fn open(
        clock: ClockConfig,
        database_path: Option<&Path>,
    ) -> Result<Self, PersistenceError> {
        match database_path {
            #[cfg(feature = "sqlite")]
            Some(path) => {
                use crate::persistence::sqlite::SqliteTaskRepository;

                tracing::info!(path = %path.display(), "using sqlite storage");
                let repository = SqliteTaskRepository::new(path)?;
                Ok(Self::with_repository(clock, Arc::new(repository)))
            }
            #[cfg(not(feature = "sqlite"))]
            Some(path) => {
                warn!(path = %path.display(), "database path ignored; built without `sqlite`");
                Ok(Self::in_memory(clock))
            }
            None => Ok(Self::in_memory(clock)),
        }
    }

    /// Whether changes are written through to a repository.
    pub fn is_persistent(&self) -> bool {
        self.repository.is_some()
    }

    pub fn engine(&self) -> &SchedulingEngine {
        &self.engine
    }

    pub fn list(&self, date: NaiveDate) -> ScheduleResult<Vec<Task>> {
        self.hydrate(date)?;
        Ok(self.engine.list(date))
    }

    pub fn get(&self, id: TaskId) -> ScheduleResult<Task> {
        self.locate(id)?;
        self.engine.get(id)
    }

    pub fn layout(&self, date: NaiveDate) -> ScheduleResult<Vec<TaskPlacement>> {
        self.hydrate(date)?;
        Ok(self.engine.layout(date))
    }

    pub fn current_task(&self) -> ScheduleResult<(NaiveDate, TimeOfDay, Option<Task>)> {
        let (date, at) = self.engine.clock().now();
        self.hydrate(date)?;
        Ok((date, at, self.engine.current_task_at(date, at)))
    }

    pub fn create(&self, draft: &TaskDraft, force_override: bool) -> ScheduleResult<Task> {
        let date = draft
            .date
            .as_deref()
            .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok());
        if let Some(date) = date {
            self.hydrate(date)?;
        }

        let task = self.engine.create(draft, force_override)?;
        let Some(repository) = &self.repository else {
            return Ok(task);
        };
        if let Err(err) = repository.insert(&task) {
            warn!(task_id = %task.id, error = %err, "insert failed; discarding created task");
            self.engine
                .store()
                .with_day_mut(task.date, |day| day.remove(task.id));
            return Err(err.into());
        }
        Ok(task)
    }

    pub fn update(
        &self,
        id: TaskId,
        patch: &TaskPatch,
        force_override: bool,
    ) -> ScheduleResult<Task> {
        self.locate(id)?;
        let revision = self.engine.update(id, patch, force_override)?;
        self.write_revision(revision)
    }

    pub fn relocate(
        &self,
        id: TaskId,
        new_start: TimeOfDay,
        force_override: bool,
    ) -> ScheduleResult<Task> {
        self.locate(id)?;
        let revision = self.engine.relocate(id, new_start, force_override)?;
        self.write_revision(revision)
    }

    pub fn delete(&self, id: TaskId) -> ScheduleResult<Task> {
        self.locate(id)?;
        let removed = self.engine.take(id)?;
        let Some(repository) = &self.repository else {
            return Ok(removed.task);
        };
        match repository.delete_by_id(id) {
            Ok(true) => Ok(removed.task),
            Ok(false) => {
                debug!(task_id = %id, "task was already absent from storage");
                Ok(removed.task)
            }
            Err(err) => {
                warn!(task_id = %id, error = %err, "delete failed; restoring task");
                if let Err(restore_err) = self.engine.store().restore(removed) {
                    warn!(task_id = %id, error = %restore_err, "could not restore task");
                }
                Err(err.into())
            }
        }
    }

    fn write_revision(&self, revision: Revision) -> ScheduleResult<Task> {
        let Some(repository) = &self.repository else {
            return Ok(revision.current);
        };
        let id = revision.current.id;
        let outcome = match repository.update_by_id(id, &revision.current) {
            Ok(true) => return Ok(revision.current),
            Ok(false) => ScheduleError::NotFound(id),
            Err(err) => ScheduleError::Persistence(err),
        };
        warn!(task_id = %id, error = %outcome, "update failed; restoring previous version");
        self.restore(&revision);
        Err(outcome)
    }

    /// Puts the previous version back unless someone changed the task since.
    fn restore(&self, revision: &Revision) {
        let current = &revision.current;
        self.engine.store().with_day_mut(current.date, |day| {
            if day.get(current.id) != Some(current) {
                return;
            }
            if let Err(err) = day.replace(revision.previous.clone()) {
                warn!(task_id = %current.id, error = %err, "could not restore task");
            }
        });
    }

    /// Ensures the date's partition reflects the repository.
    ///
    /// The date's flag stays locked across the repository read, so callers
    /// racing on the same date wait and then find it hydrated instead of
    /// re-adding rows that a concurrent delete has already removed.
    fn hydrate(&self, date: NaiveDate) -> Result<(), PersistenceError> {
        let Some(repository) = &self.repository else {
            return Ok(());
        };
        let slot = Arc::clone(self.hydration.lock().entry(date).or_default());
        let mut hydrated = slot.lock();
        if *hydrated {
            return Ok(());
        }
        let tasks = repository.find_by_date(date)?;
        let store = self.engine.store();
        for task in tasks {
            if store.contains(task.id) {
                continue;
            }
            match store.add(task) {
                Ok(()) | Err(ScheduleError::DuplicateId(_)) => {}
                Err(err) => {
                    return Err(PersistenceError::InvalidData(format!(
                        "stored task rejected: {err}"
                    )));
                }
            }
        }
        *hydrated = true;
        debug!(date = %date, "hydrated date from repository");
        Ok(())
    }

    /// Makes sure `id` is in memory, consulting the repository if needed.
    fn locate(&self, id: TaskId) -> ScheduleResult<()> {
        if self.engine.store().contains(id) {
            return Ok(());
        }
        let Some(repository) = &self.repository else {
            return Err(ScheduleError::NotFound(id));
        };
        match repository.find_by_id(id)? {
            Some(task) => {
                self.hydrate(task.date)?;
                if self.engine.store().contains(id) {
                    Ok(())
                } else {
                    Err(ScheduleError::NotFound(id))
                }
            }
            None => Err(ScheduleError::NotFound(id)),
        }
    }
}
