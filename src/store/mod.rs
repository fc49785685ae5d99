// src/store/mod.rs

//! Storage seam. Handlers and services talk to a `dyn QuizStore`; the
//! PostgreSQL backend is used in production and the in-memory backend in
//! tests and database-less runs. Both make every method atomic on its own.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::StoreError,
    models::{
        article::Article,
        label::Label,
        question::{NewQuestion, Question, QuestionUpdate},
        quiz::{NewQuiz, Quiz, QuizStats, QuizUpdate},
        user::{NewUser, Role, User},
        user_answer::{AnsweredQuestion, RankingRow, RecordedAnswer, UserAnswer},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait QuizStore: Send + Sync {
    // Users

    /// Fails with `StoreError::Conflict` when the username is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn set_accepted_terms(&self, id: i64, accepted: bool) -> StoreResult<bool>;
    async fn set_opt_in_ranking(&self, id: i64, opt_in: bool) -> StoreResult<bool>;
    /// Returns the updated user, `None` if no user has that name.
    async fn set_role_by_username(&self, username: &str, role: Role) -> StoreResult<Option<User>>;
    /// Deletes the user and their answers.
    async fn delete_user(&self, id: i64) -> StoreResult<bool>;

    // Quizzes

    async fn create_quiz(&self, quiz: NewQuiz) -> StoreResult<Quiz>;
    /// Returns soft-deleted quizzes too; callers decide what that means.
    async fn get_quiz(&self, id: i64) -> StoreResult<Option<Quiz>>;
    /// Non-deleted quizzes, newest first.
    async fn list_quizzes(&self, published_only: bool) -> StoreResult<Vec<Quiz>>;
    /// `None` if the quiz does not exist or is deleted.
    async fn update_quiz(&self, id: i64, update: QuizUpdate) -> StoreResult<Option<Quiz>>;
    async fn soft_delete_quiz(&self, id: i64) -> StoreResult<bool>;
    async fn quiz_stats(&self, quiz_id: i64) -> StoreResult<QuizStats>;

    // Questions

    /// Appends the question at the end of its quiz (arrangement = count + 1).
    async fn create_question(&self, question: NewQuestion) -> StoreResult<Question>;
    /// The question with its alternatives in display order.
    async fn get_question(&self, id: i64) -> StoreResult<Option<Question>>;
    /// Questions of a quiz in arrangement order, with alternatives.
    async fn list_questions(&self, quiz_id: i64) -> StoreResult<Vec<Question>>;
    async fn update_question(&self, id: i64, update: QuestionUpdate) -> StoreResult<Option<Question>>;
    /// Deletes the question and closes the gap in the arrangement.
    /// Returns the owning quiz id, `None` if the question did not exist.
    async fn delete_question(&self, id: i64) -> StoreResult<Option<i64>>;
    /// `order` must hold every question id of the quiz exactly once.
    async fn rearrange_questions(&self, quiz_id: i64, order: &[i64]) -> StoreResult<()>;

    // User-answer ledger

    /// A question of the quiz presented to the user and not yet answered.
    async fn in_progress_question(&self, user_id: i64, quiz_id: i64)
    -> StoreResult<Option<UserAnswer>>;
    /// Lowest-arrangement question of the quiz with no ledger row for the user.
    async fn next_unpresented_question_id(&self, user_id: i64, quiz_id: i64) -> StoreResult<Option<i64>>;
    /// Records that the question was served. At most one row per (user, question):
    /// when a row exists already its presentation time is returned unchanged.
    async fn present_question(
        &self,
        user_id: i64,
        question_id: i64,
        presented_at: DateTime<Utc>,
    ) -> StoreResult<DateTime<Utc>>;
    async fn get_user_answer(&self, user_id: i64, question_id: i64) -> StoreResult<Option<UserAnswer>>;
    /// Conditional write: only a presented, unanswered row is updated.
    /// `false` means nothing was written.
    async fn record_answer(&self, answer: RecordedAnswer) -> StoreResult<bool>;
    /// Answered questions of the quiz in arrangement order.
    async fn answered_questions(&self, user_id: i64, quiz_id: i64) -> StoreResult<Vec<AnsweredQuestion>>;
    /// Quizzes in which the user answered every question.
    async fn completed_quiz_ids(&self, user_id: i64) -> StoreResult<Vec<i64>>;
    /// Points per opted-in user with at least one ledger row in scope.
    /// With a label, only questions of quizzes carrying it count.
    async fn ranking(&self, label_id: Option<i64>) -> StoreResult<Vec<RankingRow>>;

    // Labels

    async fn create_label(&self, name: &str) -> StoreResult<Label>;
    async fn get_label(&self, id: i64) -> StoreResult<Option<Label>>;
    async fn list_labels(&self) -> StoreResult<Vec<Label>>;
    async fn delete_label(&self, id: i64) -> StoreResult<bool>;
    /// `false` if it was attached already.
    async fn attach_label(&self, quiz_id: i64, label_id: i64) -> StoreResult<bool>;
    async fn detach_label(&self, quiz_id: i64, label_id: i64) -> StoreResult<bool>;
    async fn labels_for_quiz(&self, quiz_id: i64) -> StoreResult<Vec<Label>>;

    // Articles

    async fn create_article(&self, url: &str, title: &str) -> StoreResult<Article>;
    async fn get_article(&self, id: i64) -> StoreResult<Option<Article>>;
    async fn list_articles(&self) -> StoreResult<Vec<Article>>;
}

/// Rejects an availability window that ends before it starts.
pub(crate) fn check_window(from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<()> {
    if from > to {
        return Err(StoreError::Invalid(
            "available_from must not be after available_to".to_string(),
        ));
    }
    Ok(())
}

/// Checks that `order` is a permutation of `current`.
pub(crate) fn check_permutation(current: &[i64], order: &[i64]) -> StoreResult<()> {
    let mut expected = current.to_vec();
    let mut given = order.to_vec();
    expected.sort_unstable();
    given.sort_unstable();
    if expected != given {
        return Err(StoreError::Invalid(
            "question arrangement must list every question of the quiz exactly once".to_string(),
        ));
    }
    Ok(())
}
