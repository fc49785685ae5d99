// src/models/question.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use super::quiz::validate_optional_url;

/// Points a question is worth unless an admin says otherwise.
pub const DEFAULT_QUESTION_POINTS: i32 = 10;

/// Seconds a user gets to answer unless an admin says otherwise.
pub const DEFAULT_TIME_LIMIT_SECONDS: i32 = 30;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,

    /// The question text. Column name is `question`.
    #[sqlx(rename = "question")]
    pub text: String,

    pub image_url: Option<String>,

    /// 1-based position within the quiz. Defines presentation order.
    pub arrangement: i32,

    pub article_id: Option<i64>,
    pub points: i32,
    pub time_limit_seconds: Option<i32>,

    /// Loaded separately from `answer_alternatives`.
    #[sqlx(skip)]
    pub alternatives: Vec<Alternative>,
}

impl Question {
    /// `None` when the alternative does not belong to this question.
    pub fn is_answer_correct(&self, alternative_id: i64) -> Option<bool> {
        self.alternatives
            .iter()
            .find(|a| a.id == alternative_id)
            .map(|a| a.is_correct)
    }

    pub fn correct_alternative_ids(&self) -> Vec<i64> {
        self.alternatives
            .iter()
            .filter(|a| a.is_correct)
            .map(|a| a.id)
            .collect()
    }

    /// Seconds left of the time limit, counted from when the question was presented.
    pub fn remaining_seconds(&self, presented_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<i64> {
        let limit = i64::from(self.time_limit_seconds?);
        let elapsed = (now - presented_at).num_seconds().max(0);
        Some((limit - elapsed).max(0))
    }

    /// View of the question that does not reveal which alternative is correct.
    pub fn to_public(&self) -> PublicQuestion {
        PublicQuestion {
            id: self.id,
            quiz_id: self.quiz_id,
            text: self.text.clone(),
            image_url: self.image_url.clone(),
            arrangement: self.arrangement,
            article_id: self.article_id,
            points: self.points,
            time_limit_seconds: self.time_limit_seconds,
            alternatives: self
                .alternatives
                .iter()
                .map(|a| PublicAlternative {
                    id: a.id,
                    text: a.text.clone(),
                })
                .collect(),
        }
    }
}

/// Represents the 'answer_alternatives' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Alternative {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    #[sqlx(rename = "correct")]
    pub is_correct: bool,
    pub arrangement: i32,
}

/// DTO for sending a question to a player (excludes correctness).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub quiz_id: i64,
    pub text: String,
    pub image_url: Option<String>,
    pub arrangement: i32,
    pub article_id: Option<i64>,
    pub points: i32,
    pub time_limit_seconds: Option<i32>,
    pub alternatives: Vec<PublicAlternative>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicAlternative {
    pub id: i64,
    pub text: String,
}

/// Data needed to insert a question. The store assigns the arrangement.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub quiz_id: i64,
    pub text: String,
    pub image_url: Option<String>,
    pub article_id: Option<i64>,
    pub points: i32,
    pub time_limit_seconds: Option<i32>,
    pub alternatives: Vec<NewAlternative>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewAlternative {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// Partial update of a question. `Some(None)` clears an optional column.
#[derive(Debug, Clone, Default)]
pub struct QuestionUpdate {
    pub text: Option<String>,
    pub image_url: Option<Option<String>>,
    pub article_id: Option<Option<i64>>,
    pub points: Option<i32>,
    pub time_limit_seconds: Option<Option<i32>>,
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    #[validate(length(max = 500), custom(function = validate_optional_url))]
    pub image_url: Option<String>,
    pub article_id: Option<i64>,
    #[validate(range(min = 0, max = 1000))]
    pub points: Option<i32>,
    #[validate(range(min = 1, max = 3600))]
    pub time_limit_seconds: Option<i32>,
    #[validate(custom(function = validate_alternatives))]
    pub alternatives: Vec<NewAlternative>,
}

fn validate_alternatives(alternatives: &[NewAlternative]) -> Result<(), validator::ValidationError> {
    if alternatives.is_empty() {
        return Err(validator::ValidationError::new("alternatives_cannot_be_empty"));
    }
    for alternative in alternatives {
        if alternative.text.trim().is_empty() || alternative.text.len() > 500 {
            return Err(validator::ValidationError::new("invalid_alternative_text"));
        }
    }
    if !alternatives.iter().any(|a| a.is_correct) {
        return Err(validator::ValidationError::new("no_correct_alternative"));
    }
    Ok(())
}

/// DTO for updating a question. Fields are optional.
/// An empty `image_url` removes the image, `article_id: 0` unlinks the article
/// and `time_limit_seconds: 0` removes the time limit.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: Option<String>,
    #[validate(length(max = 500), custom(function = validate_optional_url))]
    pub image_url: Option<String>,
    pub article_id: Option<i64>,
    #[validate(range(min = 0, max = 1000))]
    pub points: Option<i32>,
    #[validate(range(min = 0, max = 3600))]
    pub time_limit_seconds: Option<i32>,
}

/// DTO for reordering the questions of a quiz: ids in their new order.
#[derive(Debug, Deserialize)]
pub struct RearrangeRequest {
    pub question_ids: Vec<i64>,
}
