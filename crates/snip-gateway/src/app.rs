use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers::{decode_handler, encode_handler, health_handler};
use crate::model::ErrorResponse;
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .nest(
                "/v1",
                Router::new()
                    .route("/encode", post(encode_handler))
                    .route("/decode", post(decode_handler)),
            )
            .with_state(state)
    }

    /// The router with request tracing and a per-request deadline.
    pub fn service(state: AppState, request_timeout: Duration) -> Router {
        Self::router(state)
            .layer(middleware::from_fn_with_state(request_timeout, deadline))
            .layer(TraceLayer::new_for_http())
    }
}

async fn deadline(State(limit): State<Duration>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(%path, timeout_ms = limit.as_millis() as u64, "request timed out");
            (
                StatusCode::REQUEST_TIMEOUT,
                Json(ErrorResponse::new("Request timed out")),
            )
                .into_response()
        }
    }
}
