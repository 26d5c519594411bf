//! Task CRUD.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tasktime_core::{Task, TaskId, TaskUpdate};
use tracing::info;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = state.db(move |db| db.list_tasks(&user)).await?;
    Ok(Json(tasks))
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(input): AppJson<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let now = state.now();
    let task = state
        .db(move |db| db.create_task(&user, &input.title, input.description, now))
        .await?;
    info!(event = "task.created", user_id = %task.user, task_id = %task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    AppJson(update): AppJson<TaskUpdate>,
) -> Result<Json<Task>, AppError> {
    let id = TaskId::new(id)?;
    let now = state.now();
    let task = state
        .db(move |db| db.update_task(&user, &id, update, now))
        .await?;
    Ok(Json(task))
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = TaskId::new(id)?;
    let deleted = id.clone();
    state.db(move |db| db.delete_task(&user, &id)).await?;
    info!(event = "task.deleted", task_id = %deleted, "task deleted");
    Ok(Json(json!({ "message": "Task removed", "id": deleted })))
}
