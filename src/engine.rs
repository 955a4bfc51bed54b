//! Validate → detect overlaps → (refuse or apply) for every task mutation.
//!
//! Each operation runs its whole decision under the target date's exclusive
//! lock, so two concurrent requests on one date can never both act on the
//! same pre-mutation overlap set. Nothing here performs I/O; write-through to
//! storage happens in [`crate::service`] after the lock is released.

use crate::clock::ClockConfig;
use crate::error::{ScheduleError, ScheduleResult};
use crate::layout::{self, TaskPlacement};
use crate::overlap::{self, Candidate, TimeRange};
use crate::store::{DailyTaskStore, RankedTask};
use crate::task::{Task, TaskDraft, TaskId, TaskPatch};
use crate::task_validation::{self, ValidPatch, ValidationErrors};
use crate::time::{self, TimeOfDay};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};

/// The before and after states of an edited task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Revision {
    pub previous: Task,
    pub current: Task,
}

#[derive(Debug, Default)]
pub struct SchedulingEngine {
    store: DailyTaskStore,
    clock: ClockConfig,
}

impl SchedulingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: DailyTaskStore) -> Self {
        Self {
            store,
            clock: ClockConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: ClockConfig) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &DailyTaskStore {
        &self.store
    }

    pub fn clock(&self) -> ClockConfig {
        self.clock
    }

    /// Creates a task. Without `force_override`, a payload that overlaps
    /// existing tasks is refused with [`ScheduleError::Conflict`] and nothing
    /// is stored. With it, validation still applies but overlaps are ignored.
    pub fn create(&self, draft: &TaskDraft, force_override: bool) -> ScheduleResult<Task> {
        let new = task_validation::validate_draft(draft)?;
        let candidate = Candidate::New(TimeRange::new(new.start_time, new.end_time));

        let task = self.store.with_day_mut(new.date, |day| {
            gate_overlaps(&candidate, day.tasks(), force_override)?;
            let now = Utc::now();
            let task = Task {
                id: TaskId::generate(),
                title: new.title,
                start_time: new.start_time,
                end_time: new.end_time,
                description: new.description,
                color: new.color,
                icon: new.icon,
                date: new.date,
                created_at: now,
                updated_at: now,
            };
            day.insert(task.clone())?;
            Ok::<_, ScheduleError>(task)
        })?;

        info!(
            task_id = %task.id,
            date = %task.date,
            start = %task.start_time,
            end = %task.end_time,
            forced = force_override,
            "created task"
        );
        Ok(task)
    }

    /// Applies a partial update. Only the supplied fields are validated;
    /// overlaps are checked against the other tasks of the same date.
    pub fn update(
        &self,
        id: TaskId,
        patch: &TaskPatch,
        force_override: bool,
    ) -> ScheduleResult<Revision> {
        let revision = self.revise(id, force_override, |current| {
            task_validation::validate_patch(patch, current)
        })?;
        info!(task_id = %id, forced = force_override, "updated task");
        Ok(revision)
    }

    /// Moves a task to a new start time, snapped to the nearest quarter hour,
    /// keeping its duration.
    pub fn relocate(
        &self,
        id: TaskId,
        new_start: TimeOfDay,
        force_override: bool,
    ) -> ScheduleResult<Revision> {
        let revision = self.revise(id, force_override, |current| {
            let start_minutes = time::snap_minutes(new_start.minutes() as f64);
            let end_minutes = start_minutes + current.duration_minutes();
            let start = TimeOfDay::from_minutes(start_minutes).ok_or_else(|| {
                ValidationErrors::single("startTime", "start time must be before midnight")
            })?;
            let end = TimeOfDay::from_minutes(end_minutes).ok_or_else(|| {
                ValidationErrors::single("endTime", "task would run past midnight")
            })?;
            task_validation::validate_range(start, end)?;
            Ok(ValidPatch::times(start, end))
        })?;
        info!(
            task_id = %id,
            start = %revision.current.start_time,
            end = %revision.current.end_time,
            forced = force_override,
            "relocated task"
        );
        Ok(revision)
    }

    /// Removes a task unconditionally.
    pub fn delete(&self, id: TaskId) -> ScheduleResult<Task> {
        self.take(id).map(|ranked| ranked.task)
    }

    /// Like [`Self::delete`], but keeps the tie-break rank so the task can be
    /// put back in place with [`DailyTaskStore::restore`].
    pub fn take(&self, id: TaskId) -> ScheduleResult<RankedTask> {
        let date = self.store.locate(id).ok_or(ScheduleError::NotFound(id))?;
        let removed = self
            .store
            .with_day_mut(date, |day| day.take(id))
            .ok_or(ScheduleError::NotFound(id))?;
        info!(task_id = %id, date = %date, "deleted task");
        Ok(removed)
    }

    pub fn list(&self, date: NaiveDate) -> Vec<Task> {
        self.store.list(date)
    }

    pub fn get(&self, id: TaskId) -> ScheduleResult<Task> {
        self.store.get(id).ok_or(ScheduleError::NotFound(id))
    }

    pub fn layout(&self, date: NaiveDate) -> Vec<TaskPlacement> {
        self.store.with_day(date, layout::layout_day)
    }

    pub fn current_task_at(&self, date: NaiveDate, at: TimeOfDay) -> Option<Task> {
        self.store
            .with_day(date, |tasks| layout::current_task(tasks, at).cloned())
    }

    /// The task running right now under the configured clock offset.
    pub fn current_task(&self) -> (NaiveDate, TimeOfDay, Option<Task>) {
        let (date, at) = self.clock.now();
        (date, at, self.current_task_at(date, at))
    }

    fn revise<F>(&self, id: TaskId, force_override: bool, make_patch: F) -> ScheduleResult<Revision>
    where
        F: FnOnce(&Task) -> Result<ValidPatch, ValidationErrors>,
    {
        let date = self.store.locate(id).ok_or(ScheduleError::NotFound(id))?;
        self.store.with_day_mut(date, |day| -> ScheduleResult<Revision> {
            let previous = day.get(id).cloned().ok_or(ScheduleError::NotFound(id))?;
            let patch = make_patch(&previous)?;

            let mut current = previous.clone();
            patch.apply_to(&mut current);
            gate_overlaps(&Candidate::from(&current), day.tasks(), force_override)?;

            current.updated_at = Utc::now();
            day.replace(current.clone())?;
            Ok(Revision { previous, current })
        })
    }
}

fn gate_overlaps(candidate: &Candidate, day: &[Task], force_override: bool) -> ScheduleResult<()> {
    let overlaps = overlap::find_overlaps(candidate, day);
    if overlaps.is_empty() {
        return Ok(());
    }
    if force_override {
        debug!(count = overlaps.len(), "overlap override accepted");
        return Ok(());
    }
    debug!(count = overlaps.len(), "refusing overlapping task");
    Err(ScheduleError::Conflict { overlaps })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
    }

    fn draft(start: &str, end: &str) -> TaskDraft {
        TaskDraft::new("2025-05-01", format!("{start}-{end}"), start, end)
    }

    #[test]
    fn concurrent_overlapping_creates_admit_exactly_one() {
        let engine = Arc::new(SchedulingEngine::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || engine.create(&draft("09:00", "10:00"), false).is_ok())
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 1);
        assert_eq!(engine.list(date()).len(), 1);
    }

    #[test]
    fn relocation_past_midnight_is_a_validation_error() {
        let engine = SchedulingEngine::new();
        let task = engine.create(&draft("10:00", "12:00"), false).unwrap();
        let err = engine
            .relocate(task.id, "23:00".parse().unwrap(), false)
            .unwrap_err();
        match err {
            ScheduleError::Validation(errors) => assert!(errors.get("endTime").is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(engine.get(task.id).unwrap().start_time.to_string(), "10:00");
    }

    #[test]
    fn relocation_snapping_to_midnight_is_rejected() {
        let engine = SchedulingEngine::new();
        let task = engine.create(&draft("10:00", "10:15"), false).unwrap();
        let err = engine
            .relocate(task.id, "23:55".parse().unwrap(), false)
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Validation(_)));
    }

    #[test]
    fn current_task_at_uses_the_day_partition() {
        let engine = SchedulingEngine::new();
        let task = engine.create(&draft("09:00", "10:00"), false).unwrap();
        let at = "09:30".parse().unwrap();
        assert_eq!(engine.current_task_at(date(), at).map(|t| t.id), Some(task.id));
        let other_day = NaiveDate::from_ymd_opt(2025, 5, 2).unwrap();
        assert!(engine.current_task_at(other_day, at).is_none());
    }
}
