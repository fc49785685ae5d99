// src/models/quiz.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use validator::Validate;

use super::label::Label;
use super::question::Question;

/// Title given to quizzes created without one.
pub const DEFAULT_QUIZ_TITLE: &str = "Ny quiz";

/// Days a freshly created quiz stays available.
pub const DEFAULT_AVAILABILITY_DAYS: i64 = 7;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub image_url: Option<String>,
    pub available_from: DateTime<Utc>,
    pub available_to: DateTime<Utc>,
    pub published: bool,

    /// Quizzes are never hard-deleted.
    pub is_deleted: bool,

    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
}

impl Quiz {
    /// Published, not deleted and inside its availability window.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.published && !self.is_deleted && self.available_from <= now && now <= self.available_to
    }
}

/// Data needed to insert a quiz.
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub title: String,
    pub image_url: Option<String>,
    pub available_from: DateTime<Utc>,
    pub available_to: DateTime<Utc>,
    pub published: bool,
}

impl NewQuiz {
    /// An unpublished quiz open for the next week, to be edited afterwards.
    pub fn with_defaults(now: DateTime<Utc>) -> Self {
        Self {
            title: DEFAULT_QUIZ_TITLE.to_string(),
            image_url: None,
            available_from: now,
            available_to: now + Duration::days(DEFAULT_AVAILABILITY_DAYS),
            published: false,
        }
    }
}

/// Partial update of a quiz. `image_url: Some(None)` removes the image.
#[derive(Debug, Clone, Default)]
pub struct QuizUpdate {
    pub title: Option<String>,
    pub image_url: Option<Option<String>>,
    pub available_from: Option<DateTime<Utc>>,
    pub available_to: Option<DateTime<Utc>>,
    pub published: Option<bool>,
}

/// Aggregates over the questions of one quiz.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QuizStats {
    pub question_count: i64,
    pub max_score: i64,
}

/// Quiz header shown while playing.
#[derive(Debug, Clone, Serialize)]
pub struct PartialQuiz {
    pub id: i64,
    pub title: String,
    pub image_url: Option<String>,
    pub available_to: DateTime<Utc>,
    pub question_count: i64,
}

/// A quiz in the player's list, with their completion status.
#[derive(Debug, Serialize)]
pub struct QuizListItem {
    pub id: i64,
    pub title: String,
    pub image_url: Option<String>,
    pub available_from: DateTime<Utc>,
    pub available_to: DateTime<Utc>,
    pub is_completed: bool,
}

/// Admin view of a quiz: everything, correctness included.
#[derive(Debug, Serialize)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<Question>,
    pub labels: Vec<Label>,
}

/// DTO for creating a quiz. Everything else starts from defaults.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
}

/// DTO for updating a quiz. Fields are optional; an empty `image_url` removes the image.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 500), custom(function = validate_optional_url))]
    pub image_url: Option<String>,
    pub available_from: Option<DateTime<Utc>>,
    pub available_to: Option<DateTime<Utc>>,
    pub published: Option<bool>,
}

/// Accepts an empty string (meaning "remove") or a well-formed URL.
pub fn validate_optional_url(url: &str) -> Result<(), validator::ValidationError> {
    if url.is_empty() {
        return Ok(());
    }
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}
