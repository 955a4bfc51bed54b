use super::{PersistenceResult, TaskRepository};
use crate::task::{Task, TaskId};
use chrono::NaiveDate;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

pub struct SqliteTaskRepository {
    connection: Mutex<Connection>,
}

impl SqliteTaskRepository {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::from_connection(connection)
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> PersistenceResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                date TEXT NOT NULL,
                start_minutes INTEGER NOT NULL,
                task_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS tasks_by_date ON tasks (date, start_minutes);
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl TaskRepository for SqliteTaskRepository {
    fn find_by_date(&self, date: NaiveDate) -> PersistenceResult<Vec<Task>> {
        let conn = self.connection.lock();
        // rowid breaks start-time ties in insertion order
        let mut stmt = conn.prepare(
            "SELECT task_json FROM tasks WHERE date = ?1 ORDER BY start_minutes ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![date_key(date)], |row| row.get::<_, String>(0))?;

        let mut tasks = Vec::new();
        for json in rows {
            let task: Task = serde_json::from_str(&json?)?;
            tasks.push(task);
        }
        debug!(date = %date, count = tasks.len(), "loaded tasks from sqlite");
        Ok(tasks)
    }

    fn find_by_id(&self, id: TaskId) -> PersistenceResult<Option<Task>> {
        let conn = self.connection.lock();
        let json: Option<String> = conn
            .query_row(
                "SELECT task_json FROM tasks WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn insert(&self, task: &Task) -> PersistenceResult<()> {
        let json = serde_json::to_string(task)?;
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO tasks (id, date, start_minutes, task_json) VALUES (?1, ?2, ?3, ?4)",
            params![
                task.id.to_string(),
                date_key(task.date),
                task.start_time.minutes(),
                json
            ],
        )?;
        Ok(())
    }

    fn update_by_id(&self, id: TaskId, task: &Task) -> PersistenceResult<bool> {
        let json = serde_json::to_string(task)?;
        let conn = self.connection.lock();
        let changed = conn.execute(
            "UPDATE tasks SET start_minutes = ?2, task_json = ?3 WHERE id = ?1",
            params![id.to_string(), task.start_time.minutes(), json],
        )?;
        Ok(changed > 0)
    }

    fn delete_by_id(&self, id: TaskId) -> PersistenceResult<bool> {
        let conn = self.connection.lock();
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id.to_string()])?;
        Ok(changed > 0)
    }
}
