//! Timer endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use tasktime_core::{ActiveTimer, ActivityEntry, TaskId, TaskTotal, Timelog, TimelogId};

use super::DateQuery;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Starts a timer; the response inlines the task so clients can show it.
pub async fn start(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(task_id): Path<String>,
) -> Result<(StatusCode, Json<ActiveTimer>), AppError> {
    let task = TaskId::new(task_id)?;
    let now = state.now();
    let timer = state
        .db(move |db| db.start_timer(&user, &task, now))
        .await?;
    Ok((StatusCode::CREATED, Json(timer)))
}

pub async fn stop(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(log_id): Path<String>,
) -> Result<Json<Timelog>, AppError> {
    let log = TimelogId::new(log_id)?;
    let now = state.now();
    let stopped = state.db(move |db| db.stop_timer(&user, &log, now)).await?;
    Ok(Json(stopped))
}

/// The running timer, as a list of zero or one entries.
pub async fn active(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<ActiveTimer>>, AppError> {
    let timers = state.db(move |db| db.active_timers(&user)).await?;
    Ok(Json(timers))
}

pub async fn day(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<ActivityEntry>>, AppError> {
    let window = query.window()?;
    let entries = state
        .db(move |db| db.day_activity(&user, &window))
        .await?;
    Ok(Json(entries))
}

pub async fn total(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(task_id): Path<String>,
) -> Result<Json<TaskTotal>, AppError> {
    let task = TaskId::new(task_id)?;
    let total = state.db(move |db| db.task_total(&user, &task)).await?;
    Ok(Json(total))
}

pub async fn for_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(task_id): Path<String>,
) -> Result<Json<Vec<Timelog>>, AppError> {
    let task = TaskId::new(task_id)?;
    let logs = state
        .db(move |db| db.task_timelogs(&user, &task))
        .await?;
    Ok(Json(logs))
}
