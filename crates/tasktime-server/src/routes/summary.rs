use axum::Json;
use axum::extract::{Query, State};
use tasktime_core::DailySummary;

use super::DateQuery;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

pub async fn today(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<DateQuery>,
) -> Result<Json<DailySummary>, AppError> {
    let window = query.window()?;
    let summary = state
        .db(move |db| db.daily_summary(&user, &window))
        .await?;
    Ok(Json(summary))
}
