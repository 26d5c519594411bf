//! Bearer token guard for protected routes.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use tasktime_core::UserId;
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

/// The user a request was authenticated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

/// Resolves the bearer token and stores [`AuthUser`] in the request
/// extensions. Requests without a valid token never reach the handler.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match header.map(|h| h.strip_prefix("Bearer ")) {
        Some(Some(token)) if !token.trim().is_empty() => token.trim(),
        Some(_) => {
            warn!(event = "auth.invalid_header", "malformed Authorization header");
            return Err(AppError::unauthenticated("Invalid Authorization header"));
        }
        None => return Err(AppError::unauthenticated("Not authorized, no token")),
    };

    let user = match state.tokens().verify(token, state.now()) {
        Ok(user) => user,
        Err(err) => {
            warn!(event = "auth.rejected", reason = %err.message, "bearer token rejected");
            return Err(err);
        }
    };

    request.extensions_mut().insert(AuthUser(user));
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| AppError::unauthenticated("Not authenticated"))
    }
}
