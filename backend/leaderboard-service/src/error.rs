use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use leaderboard_store::StoreError;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LeaderboardError>;

/// Errors raised by the ranking engine.
#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl LeaderboardError {
    pub fn invalid(message: impl Into<String>) -> Self {
        LeaderboardError::InvalidInput(message.into())
    }
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Leaderboard(#[from] LeaderboardError),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let code = self.status_code();
        // Store failures are reported generically; details stay in the logs.
        let message = match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Leaderboard(LeaderboardError::InvalidInput(msg)) => msg.clone(),
            AppError::Leaderboard(LeaderboardError::Store(_)) => {
                "Internal leaderboard error".to_string()
            }
        };

        HttpResponse::build(code).json(ErrorResponse {
            error: message,
            code: code.as_u16(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Leaderboard(LeaderboardError::InvalidInput(_)) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Leaderboard(LeaderboardError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
