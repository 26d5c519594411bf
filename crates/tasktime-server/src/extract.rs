//! Request body extraction.

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::AppError;

/// A JSON body whose rejections render as API errors.
///
/// Missing fields, wrong types, malformed JSON and a missing content type all
/// become `validation_error` responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .inspect_err(|rejection| warn!(error = %rejection, "request body rejected"))?;
        Ok(Self(value))
    }
}
