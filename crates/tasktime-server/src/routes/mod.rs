//! HTTP routes.

mod summary;
mod tasks;
mod timelog;
mod users;

use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::{Json, Router, middleware};
use serde::Deserialize;
use serde_json::{Value, json};
use tasktime_core::{DayWindow, ValidationError};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::require_auth;
use crate::error::AppError;
use crate::state::AppState;

/// Builds the API router.
///
/// Registration, login and health are public; everything else requires a
/// bearer token.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login));

    let protected = Router::new()
        .route("/tasks", get(tasks::list).post(tasks::create))
        .route("/tasks/{id}", put(tasks::update).delete(tasks::delete))
        .route("/timelog/start/{task_id}", post(timelog::start))
        .route("/timelog/stop/{log_id}", post(timelog::stop))
        .route("/timelog/active", get(timelog::active))
        .route("/timelog/day", get(timelog::day))
        .route("/timelog/total/{task_id}", get(timelog::total))
        .route("/timelog/{task_id}", get(timelog::for_task))
        .route("/summary/today", get(summary::today))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

/// `?date=YYYY-MM-DD`, read as a day in the reference offset.
#[derive(Debug, Deserialize)]
struct DateQuery {
    date: Option<String>,
}

impl DateQuery {
    fn window(&self) -> Result<DayWindow, ValidationError> {
        DayWindow::parse(self.date.as_deref().unwrap_or_default())
    }
}

/// Liveness plus a store round trip.
async fn health(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    state.db(|db| db.ping()).await?;
    Ok(Json(json!({ "status": "ok" })))
}
