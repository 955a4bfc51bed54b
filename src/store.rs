use crate::error::{ScheduleError, ScheduleResult};
use crate::task::{Task, TaskId};
use crate::task_validation::ValidationErrors;
use chrono::NaiveDate;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// One date's tasks, kept ordered by `(start_time, insertion sequence)`.
#[derive(Debug, Default)]
pub struct DayPartition {
    tasks: Vec<Task>,
    seqs: Vec<u64>,
}

impl DayPartition {
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.position(id).map(|idx| &self.tasks[idx])
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    fn insert_sorted(&mut self, seq: u64, task: Task) {
        let key = (task.start_time, seq);
        let idx = self
            .tasks
            .iter()
            .zip(&self.seqs)
            .position(|(existing, existing_seq)| (existing.start_time, *existing_seq) > key)
            .unwrap_or(self.tasks.len());
        self.tasks.insert(idx, task);
        self.seqs.insert(idx, seq);
    }

    fn take(&mut self, idx: usize) -> (u64, Task) {
        (self.seqs.remove(idx), self.tasks.remove(idx))
    }
}

/// Exclusive access to one date's partition. Every change made through it is
/// published atomically when the closure passed to
/// [`DailyTaskStore::with_day_mut`] returns.
pub struct DayEditor<'a> {
    date: NaiveDate,
    partition: &'a mut DayPartition,
    index: &'a RwLock<HashMap<TaskId, NaiveDate>>,
    next_seq: &'a AtomicU64,
}

impl DayEditor<'_> {
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn tasks(&self) -> &[Task] {
        self.partition.tasks()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.partition.get(id)
    }

    pub fn insert(&mut self, task: Task) -> ScheduleResult<()> {
        self.claim(&task)?;
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.partition.insert_sorted(seq, task);
        Ok(())
    }

    /// Puts back a task taken with [`Self::take`], in its old tie-break slot.
    pub fn insert_ranked(&mut self, ranked: RankedTask) -> ScheduleResult<()> {
        self.claim(&ranked.task)?;
        self.partition.insert_sorted(ranked.rank, ranked.task);
        Ok(())
    }

    fn claim(&self, task: &Task) -> ScheduleResult<()> {
        if task.date != self.date {
            return Err(date_mismatch());
        }
        let mut index = self.index.write();
        if index.contains_key(&task.id) {
            return Err(ScheduleError::DuplicateId(task.id));
        }
        index.insert(task.id, self.date);
        Ok(())
    }

    /// Swaps in a new version of a task, keeping its insertion rank for
    /// tie-breaking. Returns the previous version.
    pub fn replace(&mut self, task: Task) -> ScheduleResult<Task> {
        if task.date != self.date {
            return Err(date_mismatch());
        }
        let idx = self
            .partition
            .position(task.id)
            .ok_or(ScheduleError::NotFound(task.id))?;
        let (seq, previous) = self.partition.take(idx);
        self.partition.insert_sorted(seq, task);
        Ok(previous)
    }

    pub fn remove(&mut self, id: TaskId) -> Option<Task> {
        self.take(id).map(|ranked| ranked.task)
    }

    /// Removes a task and hands back its insertion rank along with it.
    pub fn take(&mut self, id: TaskId) -> Option<RankedTask> {
        let idx = self.partition.position(id)?;
        let (rank, task) = self.partition.take(idx);
        self.index.write().remove(&id);
        Some(RankedTask { rank, task })
    }
}

/// A task removed from its partition, with the rank that orders it among
/// tasks sharing its start time.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedTask {
    pub rank: u64,
    pub task: Task,
}

fn date_mismatch() -> ScheduleError {
    ScheduleError::Validation(ValidationErrors::single(
        "date",
        "a task cannot move to another date",
    ))
}

/// In-memory tasks partitioned by date, with a global id index so lookups do
/// not need to know the date up front.
#[derive(Debug, Default)]
pub struct DailyTaskStore {
    partitions: RwLock<HashMap<NaiveDate, Arc<RwLock<DayPartition>>>>,
    index: RwLock<HashMap<TaskId, NaiveDate>>,
    next_seq: AtomicU64,
}

impl DailyTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks<I: IntoIterator<Item = Task>>(tasks: I) -> ScheduleResult<Self> {
        let store = Self::new();
        for task in tasks {
            store.add(task)?;
        }
        Ok(store)
    }

    fn partition(&self, date: NaiveDate) -> Option<Arc<RwLock<DayPartition>>> {
        self.partitions.read().get(&date).cloned()
    }

    fn partition_or_create(&self, date: NaiveDate) -> Arc<RwLock<DayPartition>> {
        if let Some(existing) = self.partition(date) {
            return existing;
        }
        self.partitions.write().entry(date).or_default().clone()
    }

    /// Runs `f` while holding the date's exclusive lock. Readers of that date
    /// observe either the state before `f` or the state after it.
    pub fn with_day_mut<R>(&self, date: NaiveDate, f: impl FnOnce(&mut DayEditor<'_>) -> R) -> R {
        let partition = self.partition_or_create(date);
        let mut guard = partition.write();
        let mut editor = DayEditor {
            date,
            partition: &mut *guard,
            index: &self.index,
            next_seq: &self.next_seq,
        };
        f(&mut editor)
    }

    /// Runs `f` under the date's shared lock.
    pub fn with_day<R>(&self, date: NaiveDate, f: impl FnOnce(&[Task]) -> R) -> R {
        let Some(partition) = self.partition(date) else {
            return f(&[]);
        };
        let guard = partition.read();
        f(guard.tasks())
    }

    /// A date's tasks ordered by start time, ties in insertion order.
    pub fn list(&self, date: NaiveDate) -> Vec<Task> {
        self.with_day(date, <[Task]>::to_vec)
    }

    pub fn locate(&self, id: TaskId) -> Option<NaiveDate> {
        self.index.read().get(&id).copied()
    }

    pub fn get(&self, id: TaskId) -> Option<Task> {
        let date = self.locate(id)?;
        self.with_day(date, |tasks| tasks.iter().find(|task| task.id == id).cloned())
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.index.read().contains_key(&id)
    }

    pub fn add(&self, task: Task) -> ScheduleResult<()> {
        self.with_day_mut(task.date, |day| day.insert(task))
    }

    pub fn restore(&self, ranked: RankedTask) -> ScheduleResult<()> {
        self.with_day_mut(ranked.task.date, |day| day.insert_ranked(ranked))
    }

    pub fn replace(&self, id: TaskId, task: Task) -> ScheduleResult<Task> {
        if task.id != id {
            return Err(ScheduleError::Validation(ValidationErrors::single(
                "id",
                "task id cannot change",
            )));
        }
        let date = self.locate(id).ok_or(ScheduleError::NotFound(id))?;
        self.with_day_mut(date, |day| day.replace(task))
    }

    pub fn remove(&self, id: TaskId) -> Option<Task> {
        let date = self.locate(id)?;
        self.with_day_mut(date, |day| day.remove(id))
    }

    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .partitions
            .read()
            .iter()
            .filter(|(_, partition)| !partition.read().is_empty())
            .map(|(date, _)| *date)
            .collect();
        dates.sort();
        dates
    }

    /// Every task, ordered by date and then as [`Self::list`] orders them.
    pub fn snapshot(&self) -> Vec<Task> {
        self.dates()
            .into_iter()
            .flat_map(|date| self.list(date))
            .collect()
    }
}
