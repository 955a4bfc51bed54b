use super::{PersistenceError, PersistenceResult};
use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct TaskSnapshot {
    version: u32,
    tasks: Vec<Task>,
}

fn check_tasks(tasks: &[Task]) -> PersistenceResult<()> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen.insert(task.id) {
            return Err(PersistenceError::InvalidData(format!(
                "duplicate task id {}",
                task.id
            )));
        }
        if task.end_time <= task.start_time {
            return Err(PersistenceError::InvalidData(format!(
                "task {} ends at {} before it starts at {}",
                task.id, task.end_time, task.start_time
            )));
        }
    }
    Ok(())
}

pub fn save_tasks_to_json<P: AsRef<Path>>(tasks: &[Task], path: P) -> PersistenceResult<()> {
    check_tasks(tasks)?;
    let snapshot = TaskSnapshot {
        version: SNAPSHOT_VERSION,
        tasks: tasks.to_vec(),
    };
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    Ok(())
}

pub fn load_tasks_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<Task>> {
    let file = File::open(path)?;
    let snapshot: TaskSnapshot = serde_json::from_reader(file)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(PersistenceError::InvalidData(format!(
            "unsupported snapshot version {}",
            snapshot.version
        )));
    }
    check_tasks(&snapshot.tasks)?;
    Ok(snapshot.tasks)
}

#[derive(Serialize)]
struct TaskCsvRecord<'a> {
    id: String,
    date: String,
    start_time: String,
    end_time: String,
    duration_minutes: i64,
    title: &'a str,
    description: &'a str,
    color: &'a str,
    icon: &'a str,
}

impl<'a> From<&'a Task> for TaskCsvRecord<'a> {
    fn from(task: &'a Task) -> Self {
        Self {
            id: task.id.to_string(),
            date: task.date.format("%Y-%m-%d").to_string(),
            start_time: task.start_time.to_string(),
            end_time: task.end_time.to_string(),
            duration_minutes: task.duration_minutes(),
            title: &task.title,
            description: task.description.as_deref().unwrap_or_default(),
            color: &task.color,
            icon: task.icon.as_deref().unwrap_or_default(),
        }
    }
}

/// Writes one row per task, in the order given.
pub fn export_day_to_csv<P: AsRef<Path>>(tasks: &[Task], path: P) -> PersistenceResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for task in tasks {
        writer.serialize(TaskCsvRecord::from(task))?;
    }
    writer.flush()?;
    Ok(())
}
