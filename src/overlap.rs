use crate::task::{Task, TaskId};
use crate::time::TimeOfDay;

/// Half-open `[start, end)` interval within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeRange {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    pub fn of(task: &Task) -> Self {
        Self::new(task.start_time, task.end_time)
    }

    /// Touching ranges (one ends where the other starts) do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// What is being checked against a day's tasks. An existing task is excluded
/// from its own conflict set by id, never by comparing field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    New(TimeRange),
    Existing(TaskId, TimeRange),
}

impl Candidate {
    pub fn range(&self) -> TimeRange {
        match self {
            Candidate::New(range) | Candidate::Existing(_, range) => *range,
        }
    }

    fn excludes(&self, task: &Task) -> bool {
        matches!(self, Candidate::Existing(id, _) if *id == task.id)
    }
}

impl From<&Task> for Candidate {
    fn from(task: &Task) -> Self {
        Candidate::Existing(task.id, TimeRange::of(task))
    }
}

/// Every task in `existing` that conflicts with `candidate`, in the order of
/// `existing` (which callers keep sorted by start time).
pub fn find_overlaps<'a, I>(candidate: &Candidate, existing: I) -> Vec<Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    let range = candidate.range();
    existing
        .into_iter()
        .filter(|task| !candidate.excludes(task))
        .filter(|task| range.overlaps(&TimeRange::of(task)))
        .cloned()
        .collect()
}

pub fn has_overlap<'a, I>(candidate: &Candidate, existing: I) -> bool
where
    I: IntoIterator<Item = &'a Task>,
{
    let range = candidate.range();
    existing
        .into_iter()
        .any(|task| !candidate.excludes(task) && range.overlaps(&TimeRange::of(task)))
}
