//! Tasks - the units of work time is tracked against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{TaskId, TaskStatus, UserId, ValidationError};

/// A task owned by a single user.
///
/// `time_spent` is the accumulated tracked time in seconds. It grows when a
/// timer on this task is stopped, and can be overwritten by a direct edit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    /// The owning user. Ownership never transfers.
    pub user: UserId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub time_spent: u64,
    pub created_at: DateTime<Utc>,
    /// Last user edit. Stopping a timer does not touch this.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a pending task with no tracked time.
    pub fn new(
        user: UserId,
        title: &str,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: TaskId::generate(),
            user,
            title: validate_title(title)?,
            description,
            status: TaskStatus::Pending,
            time_spent: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a partial edit. Fields left as `None` are unchanged.
    pub fn apply(&mut self, update: TaskUpdate, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if let Some(title) = update.title {
            self.title = validate_title(&title)?;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(time_spent) = update.time_spent {
            self.time_spent = time_spent;
        }
        self.updated_at = now;
        Ok(())
    }
}

/// A partial edit of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub time_spent: Option<u64>,
}

/// Trims a task title and rejects it when nothing is left.
pub fn validate_title(title: &str) -> Result<String, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::Empty { field: "title" });
    }
    Ok(title.to_string())
}
