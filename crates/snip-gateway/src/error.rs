use crate::model::ErrorResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use snip_core::ValidationKind;
use snip_shortener::ShortenerError;
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

pub const NOT_FOUND_MESSAGE: &str = "Short URL not found";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
pub enum AppError {
    Shortener(ShortenerError),
    /// The short URL is well formed but maps to nothing.
    NotFound,
}

impl From<ShortenerError> for AppError {
    fn from(value: ShortenerError) -> Self {
        Self::Shortener(value)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE.to_string()),
            AppError::Shortener(ShortenerError::Rejected(reason)) => {
                let status = match reason.kind() {
                    ValidationKind::Config => {
                        error!(error = %reason, "server misconfigured");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                    ValidationKind::Invalid | ValidationKind::Unreachable => {
                        StatusCode::BAD_REQUEST
                    }
                };
                (status, reason.to_string())
            }
            AppError::Shortener(other) => {
                error!(error = %other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MESSAGE.to_string(),
                )
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
