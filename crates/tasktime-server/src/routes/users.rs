//! Registration and login.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tasktime_core::{UserId, ValidationError};
use tasktime_db::{NewUser, UserRecord};
use tracing::{info, warn};

use crate::auth::password::MIN_PASSWORD_LEN;
use crate::auth::{hash_password, verify_password};
use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A user as returned to clients. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl From<UserRecord> for UserView {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserView,
    pub token: String,
}

/// Trims and lowercases an email, rejecting anything without a local part
/// and a domain.
fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ValidationError::InvalidEmail { value: email }),
    }
}

pub async fn register(
    State(state): State<AppState>,
    AppJson(input): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(ValidationError::Empty { field: "name" }.into());
    }
    let email = normalize_email(&input.email)?;
    if input.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        }
        .into());
    }

    let password_hash = hash_password(&input.password)?;
    let now = state.now();
    let new_user = NewUser {
        name,
        email,
        password_hash,
    };
    let record = state
        .db(move |db| db.create_user(&new_user, now))
        .await?;
    let token = state.tokens().issue(&record.id, now)?;

    info!(event = "user.registered", user_id = %record.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: record.into(),
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(input): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = input.email.trim().to_lowercase();
    let lookup = email.clone();
    let record = state
        .db(move |db| db.find_user_by_email(&lookup))
        .await?;

    let Some(record) = record.filter(|r| verify_password(&input.password, &r.password_hash))
    else {
        warn!(event = "auth.failed", email = %email, "login rejected");
        return Err(AppError::invalid_credentials());
    };

    let token = state.tokens().issue(&record.id, state.now())?;
    info!(event = "auth.success", user_id = %record.id, "user logged in");

    Ok(Json(AuthResponse {
        user: record.into(),
        token,
    }))
}
