// src/models/user_answer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::question::PublicQuestion;
use super::quiz::PartialQuiz;

/// Represents the 'user_answers' table in the database.
/// One row per (user, question); the ledger of progress and scoring.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct UserAnswer {
    pub user_id: i64,
    pub question_id: i64,
    pub question_presented_at: DateTime<Utc>,

    /// `None` while the question is presented but not answered.
    pub chosen_answer_alternative_id: Option<i64>,
    pub answered_at: Option<DateTime<Utc>>,
    pub points_awarded: i32,
}

impl UserAnswer {
    pub fn is_answered(&self) -> bool {
        self.chosen_answer_alternative_id.is_some()
    }
}

/// The answer to record for a presented question.
#[derive(Debug, Clone, Copy)]
pub struct RecordedAnswer {
    pub user_id: i64,
    pub question_id: i64,
    pub alternative_id: i64,
    pub points_awarded: i32,
    pub answered_at: DateTime<Utc>,
}

/// The question a user is currently being served, as returned by the play endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct QuizPlay {
    pub quiz: PartialQuiz,
    pub question: PublicQuestion,
    pub presented_at: DateTime<Utc>,
    /// 1-based position of the question.
    pub question_number: i32,
    pub remaining_seconds: Option<i64>,
}

/// Feedback after answering a question.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    pub question_id: i64,
    pub chosen_alternative_id: i64,
    pub is_correct: bool,
    pub points_awarded: i32,
    pub correct_alternative_ids: Vec<i64>,
    pub next_question_id: Option<i64>,
    pub quiz_completed: bool,
}

/// One answered question of a quiz summary.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct AnsweredQuestion {
    pub question_id: i64,
    pub question_text: String,
    pub max_points: i32,
    pub chosen_alternative_id: i64,
    pub chosen_alternative_text: String,
    pub is_correct: bool,
    pub points_awarded: i32,
    pub article_id: Option<i64>,
}

/// Result of a completed quiz for one user.
#[derive(Debug, Clone, Serialize)]
pub struct QuizSummary {
    pub quiz_id: i64,
    pub quiz_title: String,
    pub quiz_available_to: DateTime<Utc>,
    pub max_score: i64,
    pub achieved_score: i64,
    pub answered_questions: Vec<AnsweredQuestion>,
    pub has_articles_to_show: bool,
}

/// Points per user as aggregated by the store, before ordering.
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct RankingRow {
    pub user_id: i64,
    pub username: String,
    pub points: i64,
}

/// A placed row of a leaderboard.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RankingEntry {
    /// 1-based position on the leaderboard.
    pub placement: usize,
    pub user_id: i64,
    pub username: String,
    pub points: i64,
}

/// Response of the public leaderboard.
#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub label_id: Option<i64>,
    pub ranking: Vec<RankingEntry>,
    /// The caller's own placement, when they are ranked.
    pub me: Option<RankingEntry>,
}
