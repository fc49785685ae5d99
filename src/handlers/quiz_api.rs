// src/handlers/quiz_api.rs

use std::sync::Arc;

use axum::{
    Extension, Form, Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::{parse_id, quiz::QuizIdQuery};
use crate::{
    error::AppError,
    middleware::CurrentUser,
    services::{next_question_in_quiz, submit_answer},
    store::QuizStore,
    utils::session::SessionKeys,
};

#[derive(Debug, Deserialize)]
pub struct QuestionIdQuery {
    #[serde(rename = "questionid")]
    pub question_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerForm {
    pub answer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptTermsForm {
    #[serde(rename = "accepted-terms")]
    pub accepted_terms: Option<String>,
}

/// API variant of the play page: 404 once the quiz has no more questions.
pub async fn next_question(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<QuizIdQuery>,
) -> Result<impl IntoResponse, AppError> {
    let quiz_id = parse_id(query.quiz_id.as_deref(), "quiz-id")?;
    let play = next_question_in_quiz(&*store, user.id, quiz_id, Utc::now()).await?;
    Ok(Json(play))
}

/// Submits the chosen alternative (`answer` form field) for a presented question.
pub async fn user_answer(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<QuestionIdQuery>,
    Form(form): Form<AnswerForm>,
) -> Result<impl IntoResponse, AppError> {
    let question_id = parse_id(query.question_id.as_deref(), "questionid")?;
    let alternative_id = parse_id(form.answer.as_deref(), "answer")?;

    let outcome = submit_answer(&*store, user.id, question_id, alternative_id, Utc::now()).await?;
    Ok(Json(outcome))
}

pub async fn accept_terms(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Form(form): Form<AcceptTermsForm>,
) -> Result<impl IntoResponse, AppError> {
    if form.accepted_terms.as_deref() != Some("on") {
        return Err(AppError::BadRequest(
            "Terms of service must be accepted.".to_string(),
        ));
    }

    store.set_accepted_terms(user.id, true).await?;
    tracing::info!(user_id = user.id, "Terms accepted");
    Ok(StatusCode::NO_CONTENT)
}

/// Flips whether the caller appears on leaderboards.
pub async fn toggle_participation(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let opt_in_ranking = !user.opt_in_ranking;
    store.set_opt_in_ranking(user.id, opt_in_ranking).await?;
    Ok(Json(json!({ "opt_in_ranking": opt_in_ranking })))
}

/// Deletes the caller's account together with their answers and ends the session.
pub async fn delete_profile(
    State(store): State<Arc<dyn QuizStore>>,
    State(sessions): State<SessionKeys>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    if !store.delete_user(user.id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = user.id, "User deleted their profile");
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, sessions.clear_session_cookie().to_string())],
    ))
}
