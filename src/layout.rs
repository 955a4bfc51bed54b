use crate::overlap::{self, Candidate};
use crate::task::Task;
use crate::time::TimeOfDay;
use serde::Serialize;

/// Vertical placement of a task on the day grid, one unit per minute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPlacement {
    pub task: Task,
    pub top: i64,
    pub height: i64,
    pub has_overlap: bool,
}

pub fn layout_day(tasks: &[Task]) -> Vec<TaskPlacement> {
    tasks
        .iter()
        .map(|task| TaskPlacement {
            top: task.start_time.minutes(),
            height: task.duration_minutes(),
            has_overlap: overlap::has_overlap(&Candidate::from(task), tasks),
            task: task.clone(),
        })
        .collect()
}

/// The first task (in the given order) whose range contains `at`.
pub fn current_task(tasks: &[Task], at: TimeOfDay) -> Option<&Task> {
    tasks.iter().find(|task| task.contains(at))
}
