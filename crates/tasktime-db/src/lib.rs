//! Storage layer for task time tracking.
//!
//! Provides persistence for users, tasks and timelogs using `rusqlite`, and
//! runs the timer and aggregation operations that need the store.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. The server keeps one
//! behind a `Mutex`.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in ISO 8601 format with millisecond precision
//! (e.g., `2024-01-15T10:30:00.000Z`). Every writer uses the same format, so
//! lexicographic ordering matches chronological ordering and day-window range
//! queries can compare strings directly.
//!
//! ## Single Active Timer
//!
//! `idx_timelogs_one_active` is a partial unique index on `timelogs(user_id)`
//! covering only rows with `end_time IS NULL`. A second running timelog for the
//! same user cannot be inserted, whichever connection tries.
//!
//! ## Ownership
//!
//! Every task and timelog row carries `user_id`. All public queries take the
//! requesting user and filter on it.

mod reports;
mod tasks;
mod timelogs;
mod users;

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use tasktime_core::{TaskId, TimelogId, ValidationError};
use thiserror::Error;

pub use reports::{ReconcileReport, TaskDrift};
pub use users::{NewUser, UserRecord};

/// How long a connection waits on another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored timestamp could not be parsed.
    #[error("invalid timestamp in {field}: {value}")]
    TimestampParse {
        field: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row violates a domain rule.
    #[error("invalid stored record {id}: {message}")]
    InvalidRecord { id: String, message: String },
    /// Input rejected before touching the store.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The task does not exist.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),
    /// The task exists but belongs to someone else.
    #[error("task {0} belongs to another user")]
    Forbidden(TaskId),
    /// The user already has a running timelog.
    #[error("a task is already being tracked; stop it first")]
    TimerAlreadyActive,
    /// The timelog is missing, foreign, or already stopped.
    #[error("timelog {0} cannot be stopped")]
    InvalidTimerState(TimelogId),
    /// The email address is already registered.
    #[error("email already registered: {0}")]
    EmailTaken(String),
    /// A stop was rolled back because the task total could not be incremented.
    #[error("timelog {log} was not stopped: task {task} total could not be updated")]
    TaskTotalNotUpdated { log: TimelogId, task: TaskId },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.busy_timeout(BUSY_TIMEOUT)?;
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            -- status: 'pending' | 'in-progress' | 'completed'
            -- time_spent: accumulated seconds
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL CHECK (length(trim(title)) > 0),
                description TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                time_spent INTEGER NOT NULL DEFAULT 0 CHECK (time_spent >= 0),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_user_status ON tasks(user_id, status, updated_at);

            -- end_time: NULL while the timer is running
            -- duration: whole seconds, 0 while running
            CREATE TABLE IF NOT EXISTS timelogs (
                id TEXT PRIMARY KEY,
                task_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                duration INTEGER NOT NULL DEFAULT 0 CHECK (duration >= 0),
                CHECK (end_time IS NULL OR end_time >= start_time),
                FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_timelogs_one_active
                ON timelogs(user_id) WHERE end_time IS NULL;
            CREATE INDEX IF NOT EXISTS idx_timelogs_user_start ON timelogs(user_id, start_time);
            CREATE INDEX IF NOT EXISTS idx_timelogs_task ON timelogs(task_id);
            ",
        )?;
        Ok(())
    }

    /// Runs a trivial query to confirm the connection is usable.
    pub fn ping(&self) -> Result<(), DbError> {
        self.conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(value: &str, field: &'static str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            field,
            value: value.to_string(),
            source,
        })
}

fn parse_optional_timestamp(
    value: Option<&str>,
    field: &'static str,
) -> Result<Option<DateTime<Utc>>, DbError> {
    value.map(|v| parse_timestamp(v, field)).transpose()
}

fn to_i64(value: u64, id: &str) -> Result<i64, DbError> {
    i64::try_from(value).map_err(|_| DbError::InvalidRecord {
        id: id.to_string(),
        message: format!("value {value} exceeds SQLite INTEGER range"),
    })
}

fn to_u64(value: i64, id: &str) -> Result<u64, DbError> {
    u64::try_from(value).map_err(|_| DbError::InvalidRecord {
        id: id.to_string(),
        message: format!("value {value} is negative"),
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
