//! Error types for the engine, service and HTTP layers.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::state::expression::ExpressionError;

/// Errors returned synchronously by game session commands.
///
/// They are signals for the caller, never logged or retried by the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    /// Command not allowed in the current state.
    #[error("precondition failed: {0}")]
    Precondition(String),
    /// Duplicate identity.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Submission rejected by validation.
    #[error("invalid expression: {0}")]
    InvalidExpression(String),
}

impl From<ExpressionError> for GameError {
    fn from(err: ExpressionError) -> Self {
        GameError::InvalidExpression(err.to_string())
    }
}

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Rejected by the game session.
    #[error(transparent)]
    Game(#[from] GameError),
    /// No room with this code.
    #[error("room `{0}` not found")]
    RoomNotFound(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The session task is gone.
    #[error("game session is closed")]
    SessionClosed,
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(format!("validation failed: {err}"))
    }
}

impl ServiceError {
    /// Short machine-readable error kind sent to socket clients.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Game(GameError::Precondition(_)) => "precondition",
            ServiceError::Game(GameError::Conflict(_)) => "conflict",
            ServiceError::Game(GameError::InvalidExpression(_)) => "invalid_expression",
            ServiceError::RoomNotFound(_) => "not_found",
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::SessionClosed => "unavailable",
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Game(GameError::Conflict(message)) => AppError::Conflict(message),
            ServiceError::Game(GameError::Precondition(message)) => AppError::Conflict(message),
            ServiceError::Game(GameError::InvalidExpression(message)) => {
                AppError::BadRequest(message)
            }
            ServiceError::RoomNotFound(code) => AppError::NotFound(format!("room `{code}`")),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::SessionClosed => {
                AppError::ServiceUnavailable("game session is closed".into())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
