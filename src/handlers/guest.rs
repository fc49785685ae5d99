// src/handlers/guest.rs

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::{parse_id, quiz::QuizIdQuery};
use crate::{
    error::AppError,
    models::guest::GuestSummaryRequest,
    services::guest::{guest_quiz, guest_summary, question_by_number, score_guest_answer},
    store::QuizStore,
};

#[derive(Debug, Deserialize)]
pub struct GuestQuestionQuery {
    #[serde(rename = "quiz-id")]
    pub quiz_id: Option<String>,
    #[serde(rename = "current-question")]
    pub current_question: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GuestQuestionIdQuery {
    #[serde(rename = "question-id")]
    pub question_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GuestAnswerForm {
    #[serde(rename = "answer-id")]
    pub answer_id: Option<String>,
}

/// Which quiz guests can play right now.
pub async fn open_quiz(
    State(store): State<Arc<dyn QuizStore>>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = guest_quiz(&*store, Utc::now()).await?;
    Ok(Json(json!({
        "id": quiz.id,
        "title": quiz.title,
        "image_url": quiz.image_url,
        "available_to": quiz.available_to,
    })))
}

pub async fn question(
    State(store): State<Arc<dyn QuizStore>>,
    Query(query): Query<GuestQuestionQuery>,
) -> Result<impl IntoResponse, AppError> {
    let quiz_id = parse_id(query.quiz_id.as_deref(), "quiz-id")?;
    let number = parse_id(query.current_question.as_deref(), "current-question")?;
    let number = i32::try_from(number)
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| AppError::BadRequest("'current-question' must be 1 or more".to_string()))?;

    let play = question_by_number(&*store, quiz_id, number, Utc::now()).await?;
    Ok(Json(play))
}

/// Scores the chosen alternative (`answer-id` form field). Nothing is saved.
pub async fn user_answer(
    State(store): State<Arc<dyn QuizStore>>,
    Query(query): Query<GuestQuestionIdQuery>,
    Form(form): Form<GuestAnswerForm>,
) -> Result<impl IntoResponse, AppError> {
    let question_id = parse_id(query.question_id.as_deref(), "question-id")?;
    let alternative_id = parse_id(form.answer_id.as_deref(), "answer-id")?;

    let answer = score_guest_answer(&*store, question_id, alternative_id, Utc::now()).await?;
    Ok(Json(answer))
}

pub async fn generate_summary(
    State(store): State<Arc<dyn QuizStore>>,
    Query(query): Query<QuizIdQuery>,
    Json(request): Json<GuestSummaryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz_id = parse_id(query.quiz_id.as_deref(), "quiz-id")?;
    let summary = guest_summary(&*store, quiz_id, &request.answers, Utc::now()).await?;
    Ok(Json(summary))
}
