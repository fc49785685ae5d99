// src/handlers/admin.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use super::{parse_id, quiz::leaderboard};
use crate::{
    error::AppError,
    middleware::CurrentUser,
    models::{
        article::CreateArticleRequest,
        label::CreateLabelRequest,
        question::{
            CreateQuestionRequest, DEFAULT_QUESTION_POINTS, DEFAULT_TIME_LIMIT_SECONDS,
            NewAlternative, NewQuestion, QuestionUpdate, RearrangeRequest, UpdateQuestionRequest,
        },
        quiz::{CreateQuizRequest, NewQuiz, Quiz, QuizDetail, QuizUpdate, UpdateQuizRequest},
    },
    store::QuizStore,
    utils::html::clean_html,
};

/// Loads a quiz that has not been deleted, or 404.
async fn live_quiz(store: &dyn QuizStore, id: i64) -> Result<Quiz, AppError> {
    store
        .get_quiz(id)
        .await?
        .filter(|q| !q.is_deleted)
        .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

/// Empty string means "remove".
fn optional_url(value: Option<String>) -> Option<Option<String>> {
    value.map(|url| {
        let url = url.trim().to_string();
        if url.is_empty() { None } else { Some(url) }
    })
}

async fn check_article(store: &dyn QuizStore, article_id: i64) -> Result<(), AppError> {
    store
        .get_article(article_id)
        .await?
        .ok_or(AppError::BadRequest(format!("Article {} not found", article_id)))?;
    Ok(())
}

// Quizzes

/// Creates a quiz with default values; only the title may be given.
pub async fn create_quiz(
    State(store): State<Arc<dyn QuizStore>>,
    payload: Option<Json<CreateQuizRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let mut new_quiz = NewQuiz::with_defaults(Utc::now());
    if let Some(title) = payload.title {
        new_quiz.title = clean_html(&title);
    }

    let quiz = store.create_quiz(new_quiz).await?;
    tracing::info!(quiz_id = quiz.id, "Quiz created");

    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Every non-deleted quiz, published or not.
pub async fn list_quizzes(
    State(store): State<Arc<dyn QuizStore>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_quizzes(false).await?))
}

/// A quiz with its questions (correct alternatives included) and labels.
pub async fn get_quiz(
    State(store): State<Arc<dyn QuizStore>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = live_quiz(&*store, id).await?;
    let questions = store.list_questions(id).await?;
    let labels = store.labels_for_quiz(id).await?;

    Ok(Json(QuizDetail {
        quiz,
        questions,
        labels,
    }))
}

pub async fn update_quiz(
    State(store): State<Arc<dyn QuizStore>>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    live_quiz(&*store, id).await?;

    if payload.published == Some(true) && store.quiz_stats(id).await?.question_count == 0 {
        return Err(AppError::Conflict(
            "A quiz without questions cannot be published".to_string(),
        ));
    }

    let update = QuizUpdate {
        title: payload.title.as_deref().map(clean_html),
        image_url: optional_url(payload.image_url),
        available_from: payload.available_from,
        available_to: payload.available_to,
        published: payload.published,
    };

    let quiz = store
        .update_quiz(id, update)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    tracing::info!(quiz_id = id, published = quiz.published, "Quiz updated");
    Ok(Json(quiz))
}

/// Soft delete: the quiz disappears but its answers keep counting.
pub async fn delete_quiz(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !store.soft_delete_quiz(id).await? {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    tracing::info!(quiz_id = id, admin_id = admin.id, "Quiz deleted");
    Ok(StatusCode::NO_CONTENT)
}

// Questions

/// Appends a question to the end of a quiz.
pub async fn create_question(
    State(store): State<Arc<dyn QuizStore>>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    live_quiz(&*store, quiz_id).await?;
    if let Some(article_id) = payload.article_id {
        check_article(&*store, article_id).await?;
    }

    let question = store
        .create_question(NewQuestion {
            quiz_id,
            text: clean_html(&payload.text),
            image_url: optional_url(payload.image_url).flatten(),
            article_id: payload.article_id,
            points: payload.points.unwrap_or(DEFAULT_QUESTION_POINTS),
            time_limit_seconds: Some(
                payload
                    .time_limit_seconds
                    .unwrap_or(DEFAULT_TIME_LIMIT_SECONDS),
            ),
            alternatives: payload
                .alternatives
                .into_iter()
                .map(|a| NewAlternative {
                    text: clean_html(&a.text),
                    is_correct: a.is_correct,
                })
                .collect(),
        })
        .await?;

    tracing::info!(quiz_id, question_id = question.id, "Question created");
    Ok((StatusCode::CREATED, Json(question)))
}

/// Partial update. Empty `image_url`, `article_id: 0` and
/// `time_limit_seconds: 0` clear the respective field.
pub async fn update_question(
    State(store): State<Arc<dyn QuizStore>>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let article_id = match payload.article_id {
        None => None,
        Some(0) => Some(None),
        Some(article_id) => {
            check_article(&*store, article_id).await?;
            Some(Some(article_id))
        }
    };

    let update = QuestionUpdate {
        text: payload.text.as_deref().map(clean_html),
        image_url: optional_url(payload.image_url),
        article_id,
        points: payload.points,
        time_limit_seconds: payload
            .time_limit_seconds
            .map(|limit| (limit > 0).then_some(limit)),
    };

    let question = store
        .update_question(id, update)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(question))
}

/// Deletes a question; the remaining ones close the gap in the order.
/// A published quiz keeps at least one question.
pub async fn delete_question(
    State(store): State<Arc<dyn QuizStore>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = store
        .get_question(id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    let quiz = store.get_quiz(question.quiz_id).await?;
    if quiz.is_some_and(|q| q.published && !q.is_deleted)
        && store.quiz_stats(question.quiz_id).await?.question_count <= 1
    {
        return Err(AppError::Conflict(
            "Cannot delete the last question of a published quiz".to_string(),
        ));
    }

    store
        .delete_question(id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    tracing::info!(question_id = id, quiz_id = question.quiz_id, "Question deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Sets a new question order. The body must list every question of the quiz once.
pub async fn rearrange_questions(
    State(store): State<Arc<dyn QuizStore>>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<RearrangeRequest>,
) -> Result<impl IntoResponse, AppError> {
    live_quiz(&*store, quiz_id).await?;
    store.rearrange_questions(quiz_id, &payload.question_ids).await?;
    Ok(Json(store.list_questions(quiz_id).await?))
}

// Labels

pub async fn create_label(
    State(store): State<Arc<dyn QuizStore>>,
    Json(payload): Json<CreateLabelRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let label = store.create_label(&clean_html(payload.name.trim())).await?;
    Ok((StatusCode::CREATED, Json(label)))
}

pub async fn list_labels(
    State(store): State<Arc<dyn QuizStore>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_labels().await?))
}

pub async fn delete_label(
    State(store): State<Arc<dyn QuizStore>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !store.delete_label(id).await? {
        return Err(AppError::NotFound("Label not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn attach_label(
    State(store): State<Arc<dyn QuizStore>>,
    Path((quiz_id, label_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    live_quiz(&*store, quiz_id).await?;
    store
        .get_label(label_id)
        .await?
        .ok_or(AppError::NotFound("Label not found".to_string()))?;

    let attached = store.attach_label(quiz_id, label_id).await?;
    let status = if attached { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(store.labels_for_quiz(quiz_id).await?)))
}

pub async fn detach_label(
    State(store): State<Arc<dyn QuizStore>>,
    Path((quiz_id, label_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    if !store.detach_label(quiz_id, label_id).await? {
        return Err(AppError::NotFound("Label is not attached to the quiz".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

// Articles

pub async fn create_article(
    State(store): State<Arc<dyn QuizStore>>,
    Json(payload): Json<CreateArticleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let article = store
        .create_article(payload.url.trim(), &clean_html(&payload.title))
        .await?;
    Ok((StatusCode::CREATED, Json(article)))
}

pub async fn list_articles(
    State(store): State<Arc<dyn QuizStore>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_articles().await?))
}

// Dashboard

#[derive(Debug, Deserialize)]
pub struct LabelIdQuery {
    #[serde(rename = "label-id")]
    pub label_id: Option<String>,
}

/// Leaderboard for the dashboard, optionally scoped to one label.
pub async fn dashboard_leaderboard(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Query(query): Query<LabelIdQuery>,
) -> Result<impl IntoResponse, AppError> {
    let label_id = match query.label_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_id(Some(raw), "label-id")?),
    };

    Ok(Json(leaderboard(&*store, admin.id, label_id).await?))
}
