use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use snip_engine::EngineError;
use tracing::error;

use crate::model::ErrorResponse;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Engine(EngineError),
}

impl From<EngineError> for AppError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Engine(err) => match err {
                EngineError::InvalidUrl(_)
                | EngineError::InvalidInput(_)
                | EngineError::InvalidCharacter { .. } => StatusCode::BAD_REQUEST,
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                EngineError::DuplicateKey(_) => StatusCode::CONFLICT,
                EngineError::ExternalStore(_) => StatusCode::SERVICE_UNAVAILABLE,
                EngineError::CollisionExhausted { .. } | EngineError::InvalidConfig(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::BadRequest(message) => message,
            AppError::Engine(err) => err.to_string(),
        };

        if status.is_server_error() {
            error!(status = %status, error = %message, "request failed");
        }

        let body = ErrorResponse {
            success: false,
            error: message,
        };
        (status, Json(body)).into_response()
    }
}
