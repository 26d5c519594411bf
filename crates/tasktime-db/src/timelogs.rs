//! Timer operations: starting and stopping timelogs.
//!
//! Start and stop each run inside one immediate transaction, so the
//! check-then-write steps cannot interleave with another connection's.
//! The partial unique index on running timelogs backs up the start check.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use tasktime_core::{ActiveTimer, TaskId, TaskTotal, Timelog, TimelogId, UserId};
use tracing::{error, info};

use crate::tasks::{find_task, owned_task};
use crate::{
    Database, DbError, format_timestamp, is_constraint_violation, parse_optional_timestamp,
    parse_timestamp, to_i64, to_u64,
};

/// A timelog row as stored, before parsing.
#[derive(Debug)]
struct TimelogRow {
    id: String,
    task_id: String,
    user_id: String,
    start_time: String,
    end_time: Option<String>,
    duration: i64,
}

impl TimelogRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            task_id: row.get(1)?,
            user_id: row.get(2)?,
            start_time: row.get(3)?,
            end_time: row.get(4)?,
            duration: row.get(5)?,
        })
    }

    fn into_timelog(self) -> Result<Timelog, DbError> {
        let duration = to_u64(self.duration, &self.id)?;
        Ok(Timelog {
            task: TaskId::new(self.task_id)?,
            user: UserId::new(self.user_id)?,
            start_time: parse_timestamp(&self.start_time, "start_time")?,
            end_time: parse_optional_timestamp(self.end_time.as_deref(), "end_time")?,
            duration,
            id: TimelogId::new(self.id)?,
        })
    }
}

fn find_timelog(conn: &Connection, id: &TimelogId) -> Result<Option<Timelog>, DbError> {
    conn.query_row(
        "
        SELECT id, task_id, user_id, start_time, end_time, duration
        FROM timelogs
        WHERE id = ?
        ",
        [id.as_str()],
        TimelogRow::read,
    )
    .optional()?
    .map(TimelogRow::into_timelog)
    .transpose()
}

impl Database {
    /// Starts tracking `task` for `user` at `now`.
    ///
    /// Fails with [`DbError::TaskNotFound`] or [`DbError::Forbidden`] when the
    /// task is missing or not the user's, and with
    /// [`DbError::TimerAlreadyActive`] when any timelog of the user is still
    /// running.
    pub fn start_timer(
        &mut self,
        user: &UserId,
        task: &TaskId,
        now: DateTime<Utc>,
    ) -> Result<ActiveTimer, DbError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let task = owned_task(&tx, user, task)?;

        let running: Option<String> = tx
            .query_row(
                "SELECT id FROM timelogs WHERE user_id = ? AND end_time IS NULL",
                [user.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if running.is_some() {
            return Err(DbError::TimerAlreadyActive);
        }

        let log = Timelog::start(task.id.clone(), user.clone(), now);
        let inserted = tx.execute(
            "
            INSERT INTO timelogs (id, task_id, user_id, start_time, end_time, duration)
            VALUES (?, ?, ?, ?, NULL, 0)
            ",
            params![
                log.id.as_str(),
                log.task.as_str(),
                log.user.as_str(),
                format_timestamp(log.start_time),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_constraint_violation(&err) => return Err(DbError::TimerAlreadyActive),
            Err(err) => return Err(err.into()),
        }
        tx.commit()?;

        info!(
            event = "timer.started",
            user_id = %user,
            task_id = %task.id,
            log_id = %log.id,
            "timer started"
        );
        Ok(ActiveTimer::new(log, task))
    }

    /// Stops the user's running timelog `id` at `now` and adds its duration
    /// to the task total.
    ///
    /// Missing, foreign and already-stopped timelogs all fail with
    /// [`DbError::InvalidTimerState`]. The timelog update and the task
    /// increment commit together or not at all.
    pub fn stop_timer(
        &mut self,
        user: &UserId,
        id: &TimelogId,
        now: DateTime<Utc>,
    ) -> Result<Timelog, DbError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut log = find_timelog(&tx, id)?
            .filter(|log| &log.user == user && log.is_active())
            .ok_or_else(|| DbError::InvalidTimerState(id.clone()))?;
        let duration = log
            .stop(now)
            .map_err(|_| DbError::InvalidTimerState(id.clone()))?;
        let end_time = log
            .end_time
            .ok_or_else(|| DbError::InvalidTimerState(id.clone()))?;

        let stopped = tx.execute(
            "
            UPDATE timelogs
            SET end_time = ?, duration = ?
            WHERE id = ? AND user_id = ? AND end_time IS NULL
            ",
            params![
                format_timestamp(end_time),
                to_i64(duration, id.as_str())?,
                id.as_str(),
                user.as_str(),
            ],
        )?;
        if stopped != 1 {
            return Err(DbError::InvalidTimerState(id.clone()));
        }

        let incremented = tx.execute(
            "UPDATE tasks SET time_spent = time_spent + ? WHERE id = ? AND user_id = ?",
            params![
                to_i64(duration, id.as_str())?,
                log.task.as_str(),
                user.as_str(),
            ],
        )?;
        if incremented != 1 {
            // Dropping the transaction rolls back the timelog update.
            error!(
                event = "timer.stop_diverged",
                user_id = %user,
                log_id = %id,
                task_id = %log.task,
                duration,
                "task total not incremented; stop rolled back"
            );
            return Err(DbError::TaskTotalNotUpdated {
                log: id.clone(),
                task: log.task,
            });
        }
        tx.commit()?;

        info!(
            event = "timer.stopped",
            user_id = %user,
            task_id = %log.task,
            log_id = %id,
            duration,
            "timer stopped"
        );
        Ok(log)
    }

    /// Lists the user's running timelogs with their tasks (zero or one).
    pub fn active_timers(&self, user: &UserId) -> Result<Vec<ActiveTimer>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, task_id, user_id, start_time, end_time, duration
            FROM timelogs
            WHERE user_id = ? AND end_time IS NULL
            ",
        )?;
        let rows = stmt.query_map([user.as_str()], TimelogRow::read)?;
        let mut active = Vec::new();
        for row in rows {
            let log = row?.into_timelog()?;
            match find_task(&self.conn, &log.task)? {
                Some(task) if &task.user == user => active.push(ActiveTimer::new(log, task)),
                _ => {
                    return Err(DbError::InvalidRecord {
                        id: log.id.to_string(),
                        message: format!("running timelog references unknown task {}", log.task),
                    });
                }
            }
        }
        Ok(active)
    }

    /// Lists every timelog of the user's task, oldest first.
    pub fn task_timelogs(&self, user: &UserId, task: &TaskId) -> Result<Vec<Timelog>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, task_id, user_id, start_time, end_time, duration
            FROM timelogs
            WHERE task_id = ? AND user_id = ?
            ORDER BY start_time ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([task.as_str(), user.as_str()], TimelogRow::read)?;
        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?.into_timelog()?);
        }
        Ok(logs)
    }

    /// Total time on the user's task, recomputed from stopped timelog
    /// timestamps rather than stored durations.
    pub fn task_total(&self, user: &UserId, task: &TaskId) -> Result<TaskTotal, DbError> {
        let logs = self.task_timelogs(user, task)?;
        Ok(TaskTotal::from_intervals(
            logs.into_iter().map(|log| (log.start_time, log.end_time)),
        ))
    }
}
