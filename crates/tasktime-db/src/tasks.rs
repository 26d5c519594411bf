//! Task persistence.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tasktime_core::{Task, TaskId, TaskStatus, TaskUpdate, UserId};

use crate::{Database, DbError, format_timestamp, parse_timestamp, to_i64, to_u64};

/// A task row as stored, before parsing.
#[derive(Debug)]
struct TaskRow {
    id: String,
    user_id: String,
    title: String,
    description: Option<String>,
    status: String,
    time_spent: i64,
    created_at: String,
    updated_at: String,
}

impl TaskRow {
    /// Reads the columns selected by [`TASK_COLUMNS`].
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            status: row.get(4)?,
            time_spent: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_task(self) -> Result<Task, DbError> {
        let status = self.status.parse::<TaskStatus>()?;
        let time_spent = to_u64(self.time_spent, &self.id)?;
        Ok(Task {
            user: UserId::new(self.user_id)?,
            title: self.title,
            description: self.description,
            status,
            time_spent,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
            id: TaskId::new(self.id)?,
        })
    }
}

pub(crate) const TASK_COLUMNS: &str =
    "id, user_id, title, description, status, time_spent, created_at, updated_at";

/// Loads a task by id regardless of owner.
pub(crate) fn find_task(conn: &Connection, id: &TaskId) -> Result<Option<Task>, DbError> {
    conn.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"),
        [id.as_str()],
        TaskRow::read,
    )
    .optional()?
    .map(TaskRow::into_task)
    .transpose()
}

/// Loads a task that must belong to `user`.
pub(crate) fn owned_task(conn: &Connection, user: &UserId, id: &TaskId) -> Result<Task, DbError> {
    match find_task(conn, id)? {
        None => Err(DbError::TaskNotFound(id.clone())),
        Some(task) if &task.user != user => Err(DbError::Forbidden(id.clone())),
        Some(task) => Ok(task),
    }
}

impl Database {
    /// Creates a pending task owned by `user`.
    pub fn create_task(
        &mut self,
        user: &UserId,
        title: &str,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Task, DbError> {
        let task = Task::new(user.clone(), title, description, now)?;
        self.conn.execute(
            "
            INSERT INTO tasks (id, user_id, title, description, status, time_spent, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                task.id.as_str(),
                task.user.as_str(),
                task.title,
                task.description,
                task.status.as_str(),
                to_i64(task.time_spent, task.id.as_str())?,
                format_timestamp(task.created_at),
                format_timestamp(task.updated_at),
            ],
        )?;
        tracing::debug!(task_id = %task.id, user_id = %user, "task created");
        Ok(task)
    }

    /// Lists the user's tasks, oldest first.
    pub fn list_tasks(&self, user: &UserId) -> Result<Vec<Task>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE user_id = ?
            ORDER BY created_at ASC, id ASC
            "
        ))?;
        let rows = stmt.query_map([user.as_str()], TaskRow::read)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?.into_task()?);
        }
        Ok(tasks)
    }

    /// Fetches one of the user's tasks.
    pub fn get_task(&self, user: &UserId, id: &TaskId) -> Result<Task, DbError> {
        owned_task(&self.conn, user, id)
    }

    /// Applies a partial edit to one of the user's tasks.
    pub fn update_task(
        &mut self,
        user: &UserId,
        id: &TaskId,
        update: TaskUpdate,
        now: DateTime<Utc>,
    ) -> Result<Task, DbError> {
        let tx = self.conn.transaction()?;
        let mut task = owned_task(&tx, user, id)?;
        task.apply(update, now)?;
        tx.execute(
            "
            UPDATE tasks
            SET title = ?, description = ?, status = ?, time_spent = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            ",
            params![
                task.title,
                task.description,
                task.status.as_str(),
                to_i64(task.time_spent, task.id.as_str())?,
                format_timestamp(task.updated_at),
                task.id.as_str(),
                user.as_str(),
            ],
        )?;
        tx.commit()?;
        Ok(task)
    }

    /// Deletes one of the user's tasks along with its timelogs.
    pub fn delete_task(&mut self, user: &UserId, id: &TaskId) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        owned_task(&tx, user, id)?;
        let timelogs = tx.execute(
            "DELETE FROM timelogs WHERE task_id = ? AND user_id = ?",
            params![id.as_str(), user.as_str()],
        )?;
        tx.execute(
            "DELETE FROM tasks WHERE id = ? AND user_id = ?",
            params![id.as_str(), user.as_str()],
        )?;
        tx.commit()?;
        tracing::debug!(task_id = %id, user_id = %user, timelogs, "task deleted");
        Ok(())
    }
}
