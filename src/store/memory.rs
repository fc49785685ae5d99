// src/store/memory.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

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

#[derive(Default)]
struct Tables {
    last_id: i64,
    users: BTreeMap<i64, User>,
    quizzes: BTreeMap<i64, Quiz>,
    questions: BTreeMap<i64, Question>,
    answers: BTreeMap<(i64, i64), UserAnswer>,
    labels: BTreeMap<i64, Label>,
    quiz_labels: BTreeSet<(i64, i64)>,
    articles: BTreeMap<i64, Article>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    /// Questions of a quiz in arrangement order.
    fn quiz_questions(&self, quiz_id: i64) -> Vec<&Question> {
        let mut questions: Vec<&Question> = self
            .questions
            .values()
            .filter(|q| q.quiz_id == quiz_id)
            .collect();
        questions.sort_by_key(|q| q.arrangement);
        questions
    }
}

/// Store keeping every table in process memory behind one lock.
/// Each method takes the lock once, so every operation is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(format!(
                "Username '{}' already exists",
                user.username
            )));
        }

        let id = tables.next_id();
        let user = User {
            id,
            username: user.username,
            password: user.password_hash,
            role: user.role,
            accepted_terms: false,
            opt_in_ranking: true,
            created_at: Utc::now(),
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().rev().cloned().collect())
    }

    async fn set_accepted_terms(&self, id: i64, accepted: bool) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(match tables.users.get_mut(&id) {
            Some(user) => {
                user.accepted_terms = accepted;
                true
            }
            None => false,
        })
    }

    async fn set_opt_in_ranking(&self, id: i64, opt_in: bool) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(match tables.users.get_mut(&id) {
            Some(user) => {
                user.opt_in_ranking = opt_in;
                true
            }
            None => false,
        })
    }

    async fn set_role_by_username(&self, username: &str, role: Role) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .users
            .values_mut()
            .find(|u| u.username == username)
            .map(|user| {
                user.role = role;
                user.clone()
            }))
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.answers.retain(|(user_id, _), _| *user_id != id);
        Ok(true)
    }

    async fn create_quiz(&self, quiz: NewQuiz) -> StoreResult<Quiz> {
        check_window(quiz.available_from, quiz.available_to)?;

        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let now = Utc::now();
        let quiz = Quiz {
            id,
            title: quiz.title,
            image_url: quiz.image_url,
            available_from: quiz.available_from,
            available_to: quiz.available_to,
            published: quiz.published,
            is_deleted: false,
            created_at: now,
            last_modified_at: now,
        };
        tables.quizzes.insert(id, quiz.clone());
        Ok(quiz)
    }

    async fn get_quiz(&self, id: i64) -> StoreResult<Option<Quiz>> {
        Ok(self.tables.read().await.quizzes.get(&id).cloned())
    }

    async fn list_quizzes(&self, published_only: bool) -> StoreResult<Vec<Quiz>> {
        let tables = self.tables.read().await;
        let mut quizzes: Vec<Quiz> = tables
            .quizzes
            .values()
            .filter(|q| !q.is_deleted && (!published_only || q.published))
            .cloned()
            .collect();
        quizzes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(quizzes)
    }

    async fn update_quiz(&self, id: i64, update: QuizUpdate) -> StoreResult<Option<Quiz>> {
        let mut tables = self.tables.write().await;
        let Some(quiz) = tables.quizzes.get_mut(&id).filter(|q| !q.is_deleted) else {
            return Ok(None);
        };

        let available_from = update.available_from.unwrap_or(quiz.available_from);
        let available_to = update.available_to.unwrap_or(quiz.available_to);
        check_window(available_from, available_to)?;

        if let Some(title) = update.title {
            quiz.title = title;
        }
        if let Some(image_url) = update.image_url {
            quiz.image_url = image_url;
        }
        if let Some(published) = update.published {
            quiz.published = published;
        }
        quiz.available_from = available_from;
        quiz.available_to = available_to;
        quiz.last_modified_at = Utc::now();

        Ok(Some(quiz.clone()))
    }

    async fn soft_delete_quiz(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(match tables.quizzes.get_mut(&id) {
            Some(quiz) if !quiz.is_deleted => {
                quiz.is_deleted = true;
                quiz.last_modified_at = Utc::now();
                true
            }
            _ => false,
        })
    }

    async fn quiz_stats(&self, quiz_id: i64) -> StoreResult<QuizStats> {
        let tables = self.tables.read().await;
        let questions = tables.quiz_questions(quiz_id);
        Ok(QuizStats {
            question_count: questions.len() as i64,
            max_score: questions.iter().map(|q| i64::from(q.points)).sum(),
        })
    }

    async fn create_question(&self, question: NewQuestion) -> StoreResult<Question> {
        let mut tables = self.tables.write().await;
        if !tables.quizzes.contains_key(&question.quiz_id) {
            return Err(StoreError::Invalid(format!(
                "quiz {} does not exist",
                question.quiz_id
            )));
        }

        let arrangement = tables.quiz_questions(question.quiz_id).len() as i32 + 1;
        let id = tables.next_id();
        let mut alternatives = Vec::with_capacity(question.alternatives.len());
        for (i, alternative) in question.alternatives.into_iter().enumerate() {
            alternatives.push(Alternative {
                id: tables.next_id(),
                question_id: id,
                text: alternative.text,
                is_correct: alternative.is_correct,
                arrangement: i as i32 + 1,
            });
        }

        let question = Question {
            id,
            quiz_id: question.quiz_id,
            text: question.text,
            image_url: question.image_url,
            arrangement,
            article_id: question.article_id,
            points: question.points,
            time_limit_seconds: question.time_limit_seconds,
            alternatives,
        };
        tables.questions.insert(id, question.clone());
        Ok(question)
    }

    async fn get_question(&self, id: i64) -> StoreResult<Option<Question>> {
        Ok(self.tables.read().await.questions.get(&id).cloned())
    }

    async fn list_questions(&self, quiz_id: i64) -> StoreResult<Vec<Question>> {
        let tables = self.tables.read().await;
        Ok(tables.quiz_questions(quiz_id).into_iter().cloned().collect())
    }

    async fn update_question(&self, id: i64, update: QuestionUpdate) -> StoreResult<Option<Question>> {
        let mut tables = self.tables.write().await;
        let Some(question) = tables.questions.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(text) = update.text {
            question.text = text;
        }
        if let Some(image_url) = update.image_url {
            question.image_url = image_url;
        }
        if let Some(article_id) = update.article_id {
            question.article_id = article_id;
        }
        if let Some(points) = update.points {
            question.points = points;
        }
        if let Some(time_limit) = update.time_limit_seconds {
            question.time_limit_seconds = time_limit;
        }

        Ok(Some(question.clone()))
    }

    async fn delete_question(&self, id: i64) -> StoreResult<Option<i64>> {
        let mut tables = self.tables.write().await;
        let Some(removed) = tables.questions.remove(&id) else {
            return Ok(None);
        };

        tables.answers.retain(|(_, question_id), _| *question_id != id);
        for question in tables.questions.values_mut() {
            if question.quiz_id == removed.quiz_id && question.arrangement > removed.arrangement {
                question.arrangement -= 1;
            }
        }

        Ok(Some(removed.quiz_id))
    }

    async fn rearrange_questions(&self, quiz_id: i64, order: &[i64]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let current: Vec<i64> = tables.quiz_questions(quiz_id).iter().map(|q| q.id).collect();
        check_permutation(&current, order)?;

        for (position, question_id) in order.iter().enumerate() {
            if let Some(question) = tables.questions.get_mut(question_id) {
                question.arrangement = position as i32 + 1;
            }
        }
        Ok(())
    }

    async fn in_progress_question(
        &self,
        user_id: i64,
        quiz_id: i64,
    ) -> StoreResult<Option<UserAnswer>> {
        let tables = self.tables.read().await;
        Ok(tables
            .quiz_questions(quiz_id)
            .into_iter()
            .filter_map(|q| tables.answers.get(&(user_id, q.id)))
            .find(|a| !a.is_answered())
            .cloned())
    }

    async fn next_unpresented_question_id(&self, user_id: i64, quiz_id: i64) -> StoreResult<Option<i64>> {
        let tables = self.tables.read().await;
        Ok(tables
            .quiz_questions(quiz_id)
            .into_iter()
            .find(|q| !tables.answers.contains_key(&(user_id, q.id)))
            .map(|q| q.id))
    }

    async fn present_question(
        &self,
        user_id: i64,
        question_id: i64,
        presented_at: DateTime<Utc>,
    ) -> StoreResult<DateTime<Utc>> {
        let mut tables = self.tables.write().await;
        if !tables.questions.contains_key(&question_id) {
            return Err(StoreError::Invalid(format!(
                "question {} does not exist",
                question_id
            )));
        }

        let row = tables
            .answers
            .entry((user_id, question_id))
            .or_insert_with(|| UserAnswer {
                user_id,
                question_id,
                question_presented_at: presented_at,
                chosen_answer_alternative_id: None,
                answered_at: None,
                points_awarded: 0,
            });
        Ok(row.question_presented_at)
    }

    async fn get_user_answer(&self, user_id: i64, question_id: i64) -> StoreResult<Option<UserAnswer>> {
        let tables = self.tables.read().await;
        Ok(tables.answers.get(&(user_id, question_id)).cloned())
    }

    async fn record_answer(&self, answer: RecordedAnswer) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.answers.get_mut(&(answer.user_id, answer.question_id)) {
            Some(row) if !row.is_answered() => {
                row.chosen_answer_alternative_id = Some(answer.alternative_id);
                row.answered_at = Some(answer.answered_at);
                row.points_awarded = answer.points_awarded;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn answered_questions(&self, user_id: i64, quiz_id: i64) -> StoreResult<Vec<AnsweredQuestion>> {
        let tables = self.tables.read().await;
        let mut answered = Vec::new();
        for question in tables.quiz_questions(quiz_id) {
            let Some(row) = tables.answers.get(&(user_id, question.id)) else {
                continue;
            };
            let Some(chosen_id) = row.chosen_answer_alternative_id else {
                continue;
            };
            let Some(chosen) = question.alternatives.iter().find(|a| a.id == chosen_id) else {
                continue;
            };
            answered.push(AnsweredQuestion {
                question_id: question.id,
                question_text: question.text.clone(),
                max_points: question.points,
                chosen_alternative_id: chosen.id,
                chosen_alternative_text: chosen.text.clone(),
                is_correct: chosen.is_correct,
                points_awarded: row.points_awarded,
                article_id: question.article_id,
            });
        }
        Ok(answered)
    }

    async fn completed_quiz_ids(&self, user_id: i64) -> StoreResult<Vec<i64>> {
        let tables = self.tables.read().await;
        let mut completed = Vec::new();
        for quiz in tables.quizzes.values().filter(|q| !q.is_deleted) {
            let questions = tables.quiz_questions(quiz.id);
            if questions.is_empty() {
                continue;
            }
            let all_answered = questions.iter().all(|q| {
                tables
                    .answers
                    .get(&(user_id, q.id))
                    .is_some_and(|a| a.is_answered())
            });
            if all_answered {
                completed.push(quiz.id);
            }
        }
        Ok(completed)
    }

    async fn ranking(&self, label_id: Option<i64>) -> StoreResult<Vec<RankingRow>> {
        let tables = self.tables.read().await;
        let mut points: HashMap<i64, i64> = HashMap::new();

        for ((user_id, question_id), row) in &tables.answers {
            let Some(question) = tables.questions.get(question_id) else {
                continue;
            };
            if let Some(label_id) = label_id {
                if !tables.quiz_labels.contains(&(question.quiz_id, label_id)) {
                    continue;
                }
            }
            *points.entry(*user_id).or_insert(0) += i64::from(row.points_awarded);
        }

        let mut rows: Vec<RankingRow> = points
            .into_iter()
            .filter_map(|(user_id, points)| {
                let user = tables.users.get(&user_id)?;
                user.opt_in_ranking.then(|| RankingRow {
                    user_id,
                    username: user.username.clone(),
                    points,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.points.cmp(&a.points).then(a.user_id.cmp(&b.user_id)));
        Ok(rows)
    }

    async fn create_label(&self, name: &str) -> StoreResult<Label> {
        let mut tables = self.tables.write().await;
        if tables.labels.values().any(|l| l.name == name) {
            return Err(StoreError::Conflict(format!("Label '{}' already exists", name)));
        }
        let id = tables.next_id();
        let label = Label {
            id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        tables.labels.insert(id, label.clone());
        Ok(label)
    }

    async fn get_label(&self, id: i64) -> StoreResult<Option<Label>> {
        Ok(self.tables.read().await.labels.get(&id).cloned())
    }

    async fn list_labels(&self) -> StoreResult<Vec<Label>> {
        let tables = self.tables.read().await;
        let mut labels: Vec<Label> = tables.labels.values().cloned().collect();
        labels.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(labels)
    }

    async fn delete_label(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.labels.remove(&id).is_none() {
            return Ok(false);
        }
        tables.quiz_labels.retain(|(_, label_id)| *label_id != id);
        Ok(true)
    }

    async fn attach_label(&self, quiz_id: i64, label_id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.quizzes.contains_key(&quiz_id) || !tables.labels.contains_key(&label_id) {
            return Err(StoreError::Invalid("quiz or label does not exist".to_string()));
        }
        Ok(tables.quiz_labels.insert((quiz_id, label_id)))
    }

    async fn detach_label(&self, quiz_id: i64, label_id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.quiz_labels.remove(&(quiz_id, label_id)))
    }

    async fn labels_for_quiz(&self, quiz_id: i64) -> StoreResult<Vec<Label>> {
        let tables = self.tables.read().await;
        let mut labels: Vec<Label> = tables
            .quiz_labels
            .iter()
            .filter(|(q, _)| *q == quiz_id)
            .filter_map(|(_, label_id)| tables.labels.get(label_id).cloned())
            .collect();
        labels.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(labels)
    }

    async fn create_article(&self, url: &str, title: &str) -> StoreResult<Article> {
        let mut tables = self.tables.write().await;
        if tables.articles.values().any(|a| a.url == url) {
            return Err(StoreError::Conflict(format!("Article '{}' already exists", url)));
        }
        let id = tables.next_id();
        let article = Article {
            id,
            url: url.to_string(),
            title: title.to_string(),
            created_at: Utc::now(),
        };
        tables.articles.insert(id, article.clone());
        Ok(article)
    }

    async fn get_article(&self, id: i64) -> StoreResult<Option<Article>> {
        Ok(self.tables.read().await.articles.get(&id).cloned())
    }

    async fn list_articles(&self) -> StoreResult<Vec<Article>> {
        let tables = self.tables.read().await;
        Ok(tables.articles.values().rev().cloned().collect())
    }
}
