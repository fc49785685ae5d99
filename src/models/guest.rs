// src/models/guest.rs

use serde::{Deserialize, Serialize};

use super::user_answer::AnsweredQuestion;

/// Feedback for an answer given without an account. Nothing is stored; the
/// client keeps the rows and sends them back for the summary.
#[derive(Debug, Clone, Serialize)]
pub struct GuestAnswer {
    pub answered: AnsweredQuestion,
    pub correct_alternative_ids: Vec<i64>,
    /// Number to ask for next, `None` after the last question.
    pub next_question_number: Option<i32>,
    pub quiz_completed: bool,
}

/// One choice made by a guest.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GuestChoice {
    pub question_id: i64,
    pub alternative_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct GuestSummaryRequest {
    pub answers: Vec<GuestChoice>,
}
