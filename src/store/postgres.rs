// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};

use super::{QuizStore, StoreResult, check_permutation, check_window};
use crate::{
    error::StoreError,
    models::{
        article::Article,
        label::Label,
        question::{Alternative, NewQuestion, Question, QuestionUpdate},
        quiz::{NewQuiz, Quiz, QuizStats, QuizUpdate},
        user::{NewUser, Role, User},
        user_answer::{AnsweredQuestion, RankingRow, RecordedAnswer, UserAnswer},
    },
};

const USER_COLUMNS: &str = "id, username, password, role, accepted_terms, opt_in_ranking, created_at";

const QUIZ_COLUMNS: &str = "id, title, image_url, available_from, available_to, published, \
     is_deleted, created_at, last_modified_at";

const QUESTION_COLUMNS: &str =
    "id, quiz_id, question, image_url, arrangement, article_id, points, time_limit_seconds";

const ALTERNATIVE_COLUMNS: &str = "id, question_id, text, correct, arrangement";

const ANSWER_COLUMNS: &str = "user_id, question_id, question_presented_at, \
     chosen_answer_alternative_id, answered_at, points_awarded";

/// Added to arrangements while they are being rewritten, so that the
/// `UNIQUE (quiz_id, arrangement)` constraint holds after every row update.
const ARRANGEMENT_SHIFT: i32 = 1_000_000;

/// PostgreSQL backend.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a unique-constraint violation to `StoreError::Conflict`.
fn conflict_on_unique(err: sqlx::Error, message: impl FnOnce() -> String) -> StoreError {
    match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            StoreError::Conflict(message())
        }
        other => StoreError::Database(other),
    }
}

/// Maps a foreign-key violation to `StoreError::Invalid`.
fn invalid_on_foreign_key(err: sqlx::Error, message: impl FnOnce() -> String) -> StoreError {
    match err {
        sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
            StoreError::Invalid(message())
        }
        other => StoreError::Database(other),
    }
}

async fn load_alternatives<'e, E>(executor: E, question_ids: &[i64]) -> StoreResult<Vec<Alternative>>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        "SELECT {ALTERNATIVE_COLUMNS} FROM answer_alternatives \
         WHERE question_id = ANY($1) ORDER BY question_id, arrangement, id"
    );
    let alternatives = sqlx::query_as::<_, Alternative>(&sql)
        .bind(question_ids)
        .fetch_all(executor)
        .await?;
    Ok(alternatives)
}

fn attach_alternatives(questions: &mut [Question], alternatives: Vec<Alternative>) {
    for alternative in alternatives {
        if let Some(question) = questions.iter_mut().find(|q| q.id == alternative.question_id) {
            question.alternatives.push(alternative);
        }
    }
}

#[async_trait]
impl QuizStore for PgStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (username, password, role) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, || format!("Username '{}' already exists", user.username)))
    }

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id DESC");
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    async fn set_accepted_terms(&self, id: i64, accepted: bool) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET accepted_terms = $1 WHERE id = $2")
            .bind(accepted)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_opt_in_ranking(&self, id: i64, opt_in: bool) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET opt_in_ranking = $1 WHERE id = $2")
            .bind(opt_in)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_role_by_username(&self, username: &str, role: Role) -> StoreResult<Option<User>> {
        let sql = format!("UPDATE users SET role = $1 WHERE username = $2 RETURNING {USER_COLUMNS}");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(role.as_str())
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        // user_answers rows go with the user (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn create_quiz(&self, quiz: NewQuiz) -> StoreResult<Quiz> {
        check_window(quiz.available_from, quiz.available_to)?;

        let sql = format!(
            "INSERT INTO quizzes (title, image_url, available_from, available_to, published) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {QUIZ_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Quiz>(&sql)
            .bind(&quiz.title)
            .bind(&quiz.image_url)
            .bind(quiz.available_from)
            .bind(quiz.available_to)
            .bind(quiz.published)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_quiz(&self, id: i64) -> StoreResult<Option<Quiz>> {
        let sql = format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = $1");
        Ok(sqlx::query_as::<_, Quiz>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_quizzes(&self, published_only: bool) -> StoreResult<Vec<Quiz>> {
        let sql = format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes \
             WHERE NOT is_deleted AND (NOT $1 OR published) \
             ORDER BY created_at DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, Quiz>(&sql)
            .bind(published_only)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_quiz(&self, id: i64, update: QuizUpdate) -> StoreResult<Option<Quiz>> {
        let mut tx = self.pool.begin().await?;

        let select = format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = $1 AND NOT is_deleted FOR UPDATE");
        let Some(current) = sqlx::query_as::<_, Quiz>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let available_from = update.available_from.unwrap_or(current.available_from);
        let available_to = update.available_to.unwrap_or(current.available_to);
        check_window(available_from, available_to)?;

        let sql = format!(
            "UPDATE quizzes SET title = $1, image_url = $2, available_from = $3, available_to = $4, \
             published = $5, last_modified_at = NOW() WHERE id = $6 RETURNING {QUIZ_COLUMNS}"
        );
        let quiz = sqlx::query_as::<_, Quiz>(&sql)
            .bind(update.title.unwrap_or(current.title))
            .bind(update.image_url.unwrap_or(current.image_url))
            .bind(available_from)
            .bind(available_to)
            .bind(update.published.unwrap_or(current.published))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(quiz))
    }

    async fn soft_delete_quiz(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE quizzes SET is_deleted = TRUE, last_modified_at = NOW() WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn quiz_stats(&self, quiz_id: i64) -> StoreResult<QuizStats> {
        let (question_count, max_score) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*)::BIGINT, COALESCE(SUM(points), 0)::BIGINT FROM questions WHERE quiz_id = $1",
        )
        .bind(quiz_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(QuizStats {
            question_count,
            max_score,
        })
    }

    async fn create_question(&self, question: NewQuestion) -> StoreResult<Question> {
        let mut tx = self.pool.begin().await?;

        // Locking the quiz row serializes concurrent appends to the same quiz.
        let quiz = sqlx::query_scalar::<_, i64>("SELECT id FROM quizzes WHERE id = $1 FOR UPDATE")
            .bind(question.quiz_id)
            .fetch_optional(&mut *tx)
            .await?;
        if quiz.is_none() {
            return Err(StoreError::Invalid(format!("quiz {} does not exist", question.quiz_id)));
        }

        let arrangement = sqlx::query_scalar::<_, i32>(
            "SELECT COALESCE(MAX(arrangement), 0) + 1 FROM questions WHERE quiz_id = $1",
        )
        .bind(question.quiz_id)
        .fetch_one(&mut *tx)
        .await?;

        let sql = format!(
            "INSERT INTO questions (quiz_id, question, image_url, arrangement, article_id, points, time_limit_seconds) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {QUESTION_COLUMNS}"
        );
        let article_id = question.article_id;
        let mut created = sqlx::query_as::<_, Question>(&sql)
            .bind(question.quiz_id)
            .bind(&question.text)
            .bind(&question.image_url)
            .bind(arrangement)
            .bind(question.article_id)
            .bind(question.points)
            .bind(question.time_limit_seconds)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| invalid_on_foreign_key(e, || format!("article {article_id:?} does not exist")))?;

        let insert_alternative = format!(
            "INSERT INTO answer_alternatives (question_id, text, correct, arrangement) \
             VALUES ($1, $2, $3, $4) RETURNING {ALTERNATIVE_COLUMNS}"
        );
        for (index, alternative) in question.alternatives.iter().enumerate() {
            let row = sqlx::query_as::<_, Alternative>(&insert_alternative)
                .bind(created.id)
                .bind(&alternative.text)
                .bind(alternative.is_correct)
                .bind(index as i32 + 1)
                .fetch_one(&mut *tx)
                .await?;
            created.alternatives.push(row);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn get_question(&self, id: i64) -> StoreResult<Option<Question>> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1");
        let Some(question) = sqlx::query_as::<_, Question>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let mut questions = [question];
        let alternatives = load_alternatives(&self.pool, &[id]).await?;
        attach_alternatives(&mut questions, alternatives);
        let [question] = questions;
        Ok(Some(question))
    }

    async fn list_questions(&self, quiz_id: i64) -> StoreResult<Vec<Question>> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE quiz_id = $1 ORDER BY arrangement");
        let mut questions = sqlx::query_as::<_, Question>(&sql)
            .bind(quiz_id)
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
        let alternatives = load_alternatives(&self.pool, &ids).await?;
        attach_alternatives(&mut questions, alternatives);
        Ok(questions)
    }

    async fn update_question(&self, id: i64, update: QuestionUpdate) -> StoreResult<Option<Question>> {
        let mut tx = self.pool.begin().await?;

        let select = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1 FOR UPDATE");
        let Some(current) = sqlx::query_as::<_, Question>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let article_id = update.article_id.unwrap_or(current.article_id);
        let sql = format!(
            "UPDATE questions SET question = $1, image_url = $2, article_id = $3, points = $4, \
             time_limit_seconds = $5 WHERE id = $6 RETURNING {QUESTION_COLUMNS}"
        );
        let question = sqlx::query_as::<_, Question>(&sql)
            .bind(update.text.unwrap_or(current.text))
            .bind(update.image_url.unwrap_or(current.image_url))
            .bind(article_id)
            .bind(update.points.unwrap_or(current.points))
            .bind(update.time_limit_seconds.unwrap_or(current.time_limit_seconds))
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| invalid_on_foreign_key(e, || format!("article {article_id:?} does not exist")))?;

        let mut questions = [question];
        let alternatives = load_alternatives(&mut *tx, &[id]).await?;
        attach_alternatives(&mut questions, alternatives);

        tx.commit().await?;
        let [question] = questions;
        Ok(Some(question))
    }

    async fn delete_question(&self, id: i64) -> StoreResult<Option<i64>> {
        let mut tx = self.pool.begin().await?;

        let Some(quiz_id) = sqlx::query_scalar::<_, i64>("SELECT quiz_id FROM questions WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        sqlx::query("SELECT id FROM quizzes WHERE id = $1 FOR UPDATE")
            .bind(quiz_id)
            .execute(&mut *tx)
            .await?;

        let Some(removed) =
            sqlx::query_scalar::<_, i32>("DELETE FROM questions WHERE id = $1 RETURNING arrangement")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
        else {
            return Ok(None);
        };

        sqlx::query(
            "UPDATE questions SET arrangement = arrangement + $1 WHERE quiz_id = $2 AND arrangement > $3",
        )
        .bind(ARRANGEMENT_SHIFT)
        .bind(quiz_id)
        .bind(removed)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE questions SET arrangement = arrangement - $1 - 1 WHERE quiz_id = $2 AND arrangement > $1",
        )
        .bind(ARRANGEMENT_SHIFT)
        .bind(quiz_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(quiz_id))
    }

    async fn rearrange_questions(&self, quiz_id: i64, order: &[i64]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM quizzes WHERE id = $1 FOR UPDATE")
            .bind(quiz_id)
            .execute(&mut *tx)
            .await?;

        let current = sqlx::query_scalar::<_, i64>("SELECT id FROM questions WHERE quiz_id = $1")
            .bind(quiz_id)
            .fetch_all(&mut *tx)
            .await?;
        check_permutation(&current, order)?;

        sqlx::query("UPDATE questions SET arrangement = arrangement + $1 WHERE quiz_id = $2")
            .bind(ARRANGEMENT_SHIFT)
            .bind(quiz_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE questions AS q SET arrangement = o.position::INTEGER \
             FROM UNNEST($1::BIGINT[]) WITH ORDINALITY AS o(id, position) \
             WHERE q.id = o.id AND q.quiz_id = $2",
        )
        .bind(order)
        .bind(quiz_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn in_progress_question(&self, user_id: i64, quiz_id: i64) -> StoreResult<Option<UserAnswer>> {
        let sql = format!(
            "SELECT {} FROM user_answers ua JOIN questions q ON q.id = ua.question_id \
             WHERE ua.user_id = $1 AND q.quiz_id = $2 AND ua.chosen_answer_alternative_id IS NULL \
             ORDER BY q.arrangement LIMIT 1",
            prefixed("ua", ANSWER_COLUMNS)
        );
        Ok(sqlx::query_as::<_, UserAnswer>(&sql)
            .bind(user_id)
            .bind(quiz_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn next_unpresented_question_id(&self, user_id: i64, quiz_id: i64) -> StoreResult<Option<i64>> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT q.id FROM questions q WHERE q.quiz_id = $1 AND NOT EXISTS \
             (SELECT 1 FROM user_answers ua WHERE ua.question_id = q.id AND ua.user_id = $2) \
             ORDER BY q.arrangement LIMIT 1",
        )
        .bind(quiz_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn present_question(
        &self,
        user_id: i64,
        question_id: i64,
        presented_at: DateTime<Utc>,
    ) -> StoreResult<DateTime<Utc>> {
        let inserted = sqlx::query_scalar::<_, DateTime<Utc>>(
            "INSERT INTO user_answers (user_id, question_id, question_presented_at) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, question_id) DO NOTHING RETURNING question_presented_at",
        )
        .bind(user_id)
        .bind(question_id)
        .bind(presented_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(at) = inserted {
            return Ok(at);
        }

        // Lost the race or presented earlier: keep the first presentation time.
        Ok(sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT question_presented_at FROM user_answers WHERE user_id = $1 AND question_id = $2",
        )
        .bind(user_id)
        .bind(question_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_user_answer(&self, user_id: i64, question_id: i64) -> StoreResult<Option<UserAnswer>> {
        let sql = format!("SELECT {ANSWER_COLUMNS} FROM user_answers WHERE user_id = $1 AND question_id = $2");
        Ok(sqlx::query_as::<_, UserAnswer>(&sql)
            .bind(user_id)
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn record_answer(&self, answer: RecordedAnswer) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE user_answers SET chosen_answer_alternative_id = $1, answered_at = $2, points_awarded = $3 \
             WHERE user_id = $4 AND question_id = $5 AND chosen_answer_alternative_id IS NULL",
        )
        .bind(answer.alternative_id)
        .bind(answer.answered_at)
        .bind(answer.points_awarded)
        .bind(answer.user_id)
        .bind(answer.question_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn answered_questions(&self, user_id: i64, quiz_id: i64) -> StoreResult<Vec<AnsweredQuestion>> {
        Ok(sqlx::query_as::<_, AnsweredQuestion>(
            "SELECT q.id AS question_id, q.question AS question_text, q.points AS max_points, \
                    a.id AS chosen_alternative_id, a.text AS chosen_alternative_text, \
                    a.correct AS is_correct, ua.points_awarded, q.article_id \
             FROM user_answers ua \
             JOIN questions q ON q.id = ua.question_id \
             JOIN answer_alternatives a ON a.id = ua.chosen_answer_alternative_id \
             WHERE ua.user_id = $1 AND q.quiz_id = $2 \
             ORDER BY q.arrangement",
        )
        .bind(user_id)
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn completed_quiz_ids(&self, user_id: i64) -> StoreResult<Vec<i64>> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT qz.id FROM quizzes qz \
             JOIN questions q ON q.quiz_id = qz.id \
             LEFT JOIN user_answers ua ON ua.question_id = q.id AND ua.user_id = $1 \
                  AND ua.chosen_answer_alternative_id IS NOT NULL \
             WHERE NOT qz.is_deleted \
             GROUP BY qz.id \
             HAVING COUNT(q.id) = COUNT(ua.question_id) \
             ORDER BY qz.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn ranking(&self, label_id: Option<i64>) -> StoreResult<Vec<RankingRow>> {
        Ok(sqlx::query_as::<_, RankingRow>(
            "SELECT u.id AS user_id, u.username, COALESCE(SUM(ua.points_awarded), 0)::BIGINT AS points \
             FROM user_answers ua \
             JOIN users u ON u.id = ua.user_id \
             JOIN questions q ON q.id = ua.question_id \
             WHERE u.opt_in_ranking \
               AND ($1::BIGINT IS NULL OR EXISTS \
                    (SELECT 1 FROM quiz_labels ql WHERE ql.quiz_id = q.quiz_id AND ql.label_id = $1)) \
             GROUP BY u.id, u.username \
             ORDER BY points DESC, u.id ASC",
        )
        .bind(label_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_label(&self, name: &str) -> StoreResult<Label> {
        sqlx::query_as::<_, Label>("INSERT INTO labels (name) VALUES ($1) RETURNING id, name, created_at")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, || format!("Label '{}' already exists", name)))
    }

    async fn get_label(&self, id: i64) -> StoreResult<Option<Label>> {
        Ok(sqlx::query_as::<_, Label>("SELECT id, name, created_at FROM labels WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_labels(&self) -> StoreResult<Vec<Label>> {
        Ok(sqlx::query_as::<_, Label>("SELECT id, name, created_at FROM labels ORDER BY name")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn delete_label(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM labels WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn attach_label(&self, quiz_id: i64, label_id: i64) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO quiz_labels (quiz_id, label_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(quiz_id)
        .bind(label_id)
        .execute(&self.pool)
        .await
        .map_err(|e| invalid_on_foreign_key(e, || "quiz or label does not exist".to_string()))?;
        Ok(result.rows_affected() == 1)
    }

    async fn detach_label(&self, quiz_id: i64, label_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM quiz_labels WHERE quiz_id = $1 AND label_id = $2")
            .bind(quiz_id)
            .bind(label_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn labels_for_quiz(&self, quiz_id: i64) -> StoreResult<Vec<Label>> {
        Ok(sqlx::query_as::<_, Label>(
            "SELECT l.id, l.name, l.created_at FROM labels l \
             JOIN quiz_labels ql ON ql.label_id = l.id \
             WHERE ql.quiz_id = $1 ORDER BY l.name",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_article(&self, url: &str, title: &str) -> StoreResult<Article> {
        sqlx::query_as::<_, Article>(
            "INSERT INTO articles (url, title) VALUES ($1, $2) RETURNING id, url, title, created_at",
        )
        .bind(url)
        .bind(title)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("Article '{}' already exists", url)))
    }

    async fn get_article(&self, id: i64) -> StoreResult<Option<Article>> {
        Ok(sqlx::query_as::<_, Article>("SELECT id, url, title, created_at FROM articles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_articles(&self) -> StoreResult<Vec<Article>> {
        Ok(sqlx::query_as::<_, Article>(
            "SELECT id, url, title, created_at FROM articles ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?)
    }
}

/// Qualifies a comma-separated column list with a table alias.
fn prefixed(alias: &str, columns: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
