//! Timelogs - tracked intervals against a task.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::Task;
use crate::types::{TaskId, TimelogId, UserId};

/// A timelog could not change state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimerStateError {
    #[error("timelog {0} is already stopped")]
    AlreadyStopped(TimelogId),
}

/// One tracked interval.
///
/// `end_time` is `None` while the timer is running. `duration` is whole
/// seconds and stays 0 until the log is stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Timelog {
    pub id: TimelogId,
    pub task: TaskId,
    pub user: UserId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: u64,
}

impl Timelog {
    /// Opens a running timelog at `now` (truncated to milliseconds).
    pub fn start(task: TaskId, user: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: TimelogId::generate(),
            task,
            user,
            start_time: now.trunc_subsecs(3),
            end_time: None,
            duration: 0,
        }
    }

    pub const fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Closes the timelog and returns the whole seconds it covered.
    ///
    /// A clock reading earlier than the start closes the log at its start,
    /// so `end_time >= start_time` always holds.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<u64, TimerStateError> {
        if !self.is_active() {
            return Err(TimerStateError::AlreadyStopped(self.id.clone()));
        }
        let end = now.trunc_subsecs(3).max(self.start_time);
        let duration = elapsed_seconds(self.start_time, end);
        self.end_time = Some(end);
        self.duration = duration;
        Ok(duration)
    }
}

/// A running timelog with its task inlined.
///
/// Clients rebuild the "currently running" view from this after a reload and
/// compute elapsed time themselves from `start_time`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTimer {
    pub id: TimelogId,
    pub task: Task,
    pub user: UserId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: u64,
}

impl ActiveTimer {
    pub fn new(log: Timelog, task: Task) -> Self {
        Self {
            id: log.id,
            task,
            user: log.user,
            start_time: log.start_time,
            end_time: log.end_time,
            duration: log.duration,
        }
    }
}

/// A stopped timelog as shown in a day's activity list.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: TimelogId,
    pub task: TaskId,
    pub task_title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Recomputed from the timestamps, never below one second.
    pub duration: u64,
}

/// Tracked time on one task, recomputed from its stopped timelogs.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskTotal {
    pub total_time_ms: i64,
    pub total_time_minutes: i64,
}

impl TaskTotal {
    /// Sums the closed intervals, ignoring any still running.
    pub fn from_intervals<I>(intervals: I) -> Self
    where
        I: IntoIterator<Item = (DateTime<Utc>, Option<DateTime<Utc>>)>,
    {
        let total_time_ms: i64 = intervals
            .into_iter()
            .filter_map(|(start, end)| end.map(|end| elapsed_millis(start, end)))
            .sum();
        Self {
            total_time_ms,
            total_time_minutes: total_time_ms / 60_000,
        }
    }
}

/// Milliseconds between two instants, clamped at zero.
pub fn elapsed_millis(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_milliseconds().max(0)
}

/// Whole seconds between two instants, rounded down.
pub fn elapsed_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    u64::try_from(elapsed_millis(start, end) / 1000).unwrap_or_default()
}

/// Whole seconds for reporting; a closed interval always counts at least 1s.
pub fn reported_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    elapsed_seconds(start, end).max(1)
}
