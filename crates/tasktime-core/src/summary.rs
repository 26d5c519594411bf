//! Daily summary aggregation.
//!
//! Folds one user's timelogs for a day window into the totals shown on the
//! summary page:
//!
//! 1. Total tracked seconds across every log that started in the window
//! 2. Distinct tasks touched and per-task totals
//! 3. A fixed 24-slot hourly breakdown keyed by the hour each log started
//!
//! Completed-task counts come from task records, not timelogs, and are passed
//! in by the caller.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::TaskId;
use crate::window::{DayWindow, HOURS_PER_DAY};

/// A timelog reduced to what aggregation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowLog {
    pub task: TaskId,
    /// `None` when the task no longer resolves.
    pub task_title: Option<String>,
    pub start_time: DateTime<Utc>,
    /// Stored duration in seconds; 0 for running logs.
    pub duration: u64,
}

/// Time spent on one task within the day.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskTime {
    pub title: String,
    pub time_spent: u64,
}

/// Aggregate activity for one user on one day.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub total_time_today: u64,
    pub tasks_worked_on: usize,
    pub tasks_completed: usize,
    pub completed_task_titles: Vec<String>,
    pub task_breakdown: Vec<TaskTime>,
    pub hourly_breakdown: [u64; HOURS_PER_DAY],
}

impl DailySummary {
    /// Aggregates `logs` that fall inside `window`.
    ///
    /// Logs starting outside the window are ignored, so callers may pass a
    /// superset. Per-task totals keep the order in which tasks first appear.
    pub fn build(
        window: &DayWindow,
        logs: &[WindowLog],
        completed_task_titles: Vec<String>,
    ) -> Self {
        let mut total_time_today = 0;
        let mut hourly_breakdown = [0; HOURS_PER_DAY];
        let mut tasks_seen: HashSet<&TaskId> = HashSet::new();
        let mut breakdown_index: HashMap<&TaskId, usize> = HashMap::new();
        let mut task_breakdown: Vec<TaskTime> = Vec::new();

        for log in logs.iter().filter(|log| window.contains(log.start_time)) {
            total_time_today += log.duration;
            hourly_breakdown[DayWindow::hour_of(log.start_time)] += log.duration;
            tasks_seen.insert(&log.task);

            let Some(title) = &log.task_title else {
                continue;
            };
            let index = *breakdown_index.entry(&log.task).or_insert_with(|| {
                task_breakdown.push(TaskTime {
                    title: title.clone(),
                    time_spent: 0,
                });
                task_breakdown.len() - 1
            });
            task_breakdown[index].time_spent += log.duration;
        }

        tracing::debug!(
            date = %window.date,
            total_time_today,
            tasks = tasks_seen.len(),
            "built daily summary"
        );

        Self {
            total_time_today,
            tasks_worked_on: tasks_seen.len(),
            tasks_completed: completed_task_titles.len(),
            completed_task_titles,
            task_breakdown,
            hourly_breakdown,
        }
    }
}
