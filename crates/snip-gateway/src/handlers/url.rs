use crate::error::{AppError, Result};
use crate::model::{DecodeResponse, EncodeResponse, UrlRequest};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::debug;

/// A body that is missing or not JSON is treated like an empty `url`, so the
/// validator reports it the same way.
fn submitted_url(payload: std::result::Result<Json<UrlRequest>, JsonRejection>) -> String {
    match payload {
        Ok(Json(request)) => request.url.trim().to_string(),
        Err(rejection) => {
            debug!(error = %rejection, "unreadable request body, treating url as empty");
            String::new()
        }
    }
}

pub async fn encode_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<UrlRequest>, JsonRejection>,
) -> Result<Json<EncodeResponse>> {
    let url = submitted_url(payload);
    let outcome = state.shortener().encode(&url).await?;
    Ok(Json(outcome.into()))
}

pub async fn decode_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<UrlRequest>, JsonRejection>,
) -> Result<Json<DecodeResponse>> {
    let url = submitted_url(payload);
    let outcome = state.shortener().decode(&url).await?;
    DecodeResponse::from_outcome(outcome)
        .map(Json)
        .ok_or(AppError::NotFound)
}
