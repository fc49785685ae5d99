// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate username, question already answered)
    Conflict(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness or state rule of the store was violated.
    #[error("{0}")]
    Conflict(String),

    /// The caller handed the store data it cannot accept.
    #[error("{0}")]
    Invalid(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => AppError::InternalServerError(e.to_string()),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Invalid(msg) => AppError::BadRequest(msg),
        }
    }
}

/// Domain errors of quiz progression, answering and scoring.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error("no such quiz")]
    NoSuchQuiz,

    #[error("no more unanswered questions in quiz")]
    NoMoreQuestions,

    #[error("quiz not completed")]
    QuizNotCompleted,

    #[error("question already answered")]
    AlreadyAnswered,

    #[error("question has not been presented to the user")]
    QuestionNotPresented,

    #[error("alternative does not belong to the question")]
    InvalidAlternative,

    #[error("no such question")]
    NoSuchQuestion,

    #[error("no such label")]
    NoSuchLabel,

    /// Guests may only play the quiz offered to them.
    #[error("quiz is not open to guests")]
    NotOpenToGuests,

    /// Data-integrity fault: a served question must have alternatives.
    #[error("question {0} has no alternatives")]
    MissingAlternatives(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<QuizError> for AppError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::NoSuchQuiz
            | QuizError::NoMoreQuestions
            | QuizError::NoSuchQuestion
            | QuizError::NoSuchLabel => AppError::NotFound(err.to_string()),
            QuizError::QuizNotCompleted
            | QuizError::AlreadyAnswered
            | QuizError::QuestionNotPresented => AppError::Conflict(err.to_string()),
            QuizError::InvalidAlternative => AppError::BadRequest(err.to_string()),
            QuizError::NotOpenToGuests => AppError::Forbidden(err.to_string()),
            QuizError::MissingAlternatives(_) => AppError::InternalServerError(err.to_string()),
            QuizError::Store(e) => e.into(),
        }
    }
}
