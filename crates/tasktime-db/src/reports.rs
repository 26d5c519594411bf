//! Read-side queries over a day window, plus task total reconciliation.

use std::collections::HashMap;

use rusqlite::{TransactionBehavior, params};
use tasktime_core::{
    ActivityEntry, DailySummary, DayWindow, TaskId, TaskStatus, TimelogId, UserId, WindowLog,
    elapsed_seconds, reported_seconds,
};
use tracing::{info, warn};

use crate::{Database, DbError, format_timestamp, parse_timestamp, to_i64, to_u64};

/// A task whose stored total disagrees with its timelogs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDrift {
    pub task: TaskId,
    pub title: String,
    pub stored: u64,
    pub computed: u64,
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub tasks_checked: usize,
    pub drifted: Vec<TaskDrift>,
    /// Whether drifted totals were rewritten.
    pub applied: bool,
}

impl Database {
    /// Aggregates the user's activity for one day.
    pub fn daily_summary(
        &self,
        user: &UserId,
        window: &DayWindow,
    ) -> Result<DailySummary, DbError> {
        let start = format_timestamp(window.start);
        let end = format_timestamp(window.end);

        let mut stmt = self.conn.prepare(
            "
            SELECT l.id, l.task_id, t.title, l.start_time, l.duration
            FROM timelogs l
            LEFT JOIN tasks t ON t.id = l.task_id AND t.user_id = l.user_id
            WHERE l.user_id = ? AND l.start_time >= ? AND l.start_time < ?
            ORDER BY l.start_time ASC, l.id ASC
            ",
        )?;
        let rows = stmt.query_map(params![user.as_str(), start, end], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;
        let mut logs = Vec::new();
        for row in rows {
            let (log_id, task_id, task_title, start_time, duration) = row?;
            logs.push(WindowLog {
                duration: to_u64(duration, &log_id)?,
                task: TaskId::new(task_id)?,
                task_title,
                start_time: parse_timestamp(&start_time, "start_time")?,
            });
        }

        let mut stmt = self.conn.prepare(
            "
            SELECT title
            FROM tasks
            WHERE user_id = ? AND status = ? AND updated_at >= ? AND updated_at < ?
            ORDER BY rowid ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![user.as_str(), TaskStatus::Completed.as_str(), start, end],
            |row| row.get::<_, String>(0),
        )?;
        let mut completed = Vec::new();
        for row in rows {
            completed.push(row?);
        }

        Ok(DailySummary::build(window, &logs, completed))
    }

    /// Lists the user's stopped timelogs that started within the day, newest
    /// first, with durations recomputed from their timestamps.
    pub fn day_activity(
        &self,
        user: &UserId,
        window: &DayWindow,
    ) -> Result<Vec<ActivityEntry>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT l.id, l.task_id, t.title, l.start_time, l.end_time
            FROM timelogs l
            JOIN tasks t ON t.id = l.task_id AND t.user_id = l.user_id
            WHERE l.user_id = ?
              AND l.start_time >= ? AND l.start_time < ?
              AND l.end_time IS NOT NULL
            ORDER BY l.start_time DESC, l.id DESC
            ",
        )?;
        let rows = stmt.query_map(
            params![
                user.as_str(),
                format_timestamp(window.start),
                format_timestamp(window.end)
            ],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, task_id, task_title, start_time, end_time) = row?;
            let start_time = parse_timestamp(&start_time, "start_time")?;
            let end_time = parse_timestamp(&end_time, "end_time")?;
            entries.push(ActivityEntry {
                id: TimelogId::new(id)?,
                task: TaskId::new(task_id)?,
                task_title,
                start_time,
                end_time,
                duration: reported_seconds(start_time, end_time),
            });
        }
        Ok(entries)
    }

    /// Recomputes task totals from stopped timelogs.
    ///
    /// Each stopped timelog contributes its whole elapsed seconds. With
    /// `apply`, drifted totals are rewritten; otherwise the report only lists
    /// them. `user` limits the pass to one user's tasks.
    ///
    /// Reads and writes share one immediate transaction, so a timer stopped
    /// on another connection lands either wholly before or wholly after the
    /// pass.
    pub fn reconcile_task_times(
        &mut self,
        user: Option<&UserId>,
        apply: bool,
    ) -> Result<ReconcileReport, DbError> {
        let user_filter = user.map(UserId::as_str);
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut computed: HashMap<String, u64> = HashMap::new();
        {
            let mut stmt = tx.prepare(
                "
                SELECT task_id, start_time, end_time
                FROM timelogs
                WHERE end_time IS NOT NULL AND (?1 IS NULL OR user_id = ?1)
                ",
            )?;
            let rows = stmt.query_map([user_filter], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;
            for row in rows {
                let (task_id, start_time, end_time) = row?;
                let seconds = elapsed_seconds(
                    parse_timestamp(&start_time, "start_time")?,
                    parse_timestamp(&end_time, "end_time")?,
                );
                *computed.entry(task_id).or_default() += seconds;
            }
        }

        let mut report = ReconcileReport::default();
        {
            let mut stmt = tx.prepare(
                "
                SELECT id, title, time_spent
                FROM tasks
                WHERE ?1 IS NULL OR user_id = ?1
                ORDER BY created_at ASC, id ASC
                ",
            )?;
            let rows = stmt.query_map([user_filter], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?;
            for row in rows {
                let (id, title, stored) = row?;
                report.tasks_checked += 1;
                let stored = to_u64(stored, &id)?;
                let expected = computed.get(&id).copied().unwrap_or_default();
                if stored != expected {
                    report.drifted.push(TaskDrift {
                        task: TaskId::new(id)?,
                        title,
                        stored,
                        computed: expected,
                    });
                }
            }
        }

        for drift in &report.drifted {
            warn!(
                event = "reconcile.drift",
                task_id = %drift.task,
                stored = drift.stored,
                computed = drift.computed,
                "task total differs from timelogs"
            );
        }

        if apply && !report.drifted.is_empty() {
            for drift in &report.drifted {
                tx.execute(
                    "
                    UPDATE tasks
                    SET time_spent = ?1
                    WHERE id = ?2 AND (?3 IS NULL OR user_id = ?3)
                    ",
                    params![
                        to_i64(drift.computed, drift.task.as_str())?,
                        drift.task.as_str(),
                        user_filter,
                    ],
                )?;
            }
            report.applied = true;
        }
        tx.commit()?;

        info!(
            event = "reconcile.finished",
            tasks_checked = report.tasks_checked,
            drifted = report.drifted.len(),
            applied = report.applied,
            "reconciliation pass finished"
        );
        Ok(report)
    }
}
