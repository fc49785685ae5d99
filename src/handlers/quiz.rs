// src/handlers/quiz.rs

use std::{collections::HashSet, sync::Arc};

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::parse_id;
use crate::{
    error::{AppError, QuizError},
    middleware::CurrentUser,
    models::{
        quiz::QuizListItem,
        user::ProfileResponse,
        user_answer::LeaderboardResponse,
    },
    services::{next_question_in_quiz, quiz_summary, ranking, user_placement},
    store::QuizStore,
};

#[derive(Debug, Deserialize)]
pub struct QuizIdQuery {
    #[serde(rename = "quiz-id")]
    pub quiz_id: Option<String>,
}

/// Open quizzes with whether the caller has completed each.
pub async fn list_open_quizzes(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let completed: HashSet<i64> = store.completed_quiz_ids(user.id).await?.into_iter().collect();

    let quizzes: Vec<QuizListItem> = store
        .list_quizzes(true)
        .await?
        .into_iter()
        .filter(|q| q.is_open(now))
        .map(|q| QuizListItem {
            is_completed: completed.contains(&q.id),
            id: q.id,
            title: q.title,
            image_url: q.image_url,
            available_from: q.available_from,
            available_to: q.available_to,
        })
        .collect();

    Ok(Json(quizzes))
}

/// Serves the current question of a quiz. Once every question is answered
/// the caller is sent on to the summary.
pub async fn play(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<QuizIdQuery>,
) -> Result<Response, AppError> {
    let quiz_id = parse_id(query.quiz_id.as_deref(), "quiz-id")?;

    match next_question_in_quiz(&*store, user.id, quiz_id, Utc::now()).await {
        Ok(play) => Ok(Json(play).into_response()),
        Err(QuizError::NoMoreQuestions) => {
            Ok(Redirect::temporary(&format!("/quiz/summary?quiz-id={}", quiz_id)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn summary(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<QuizIdQuery>,
) -> Result<impl IntoResponse, AppError> {
    let quiz_id = parse_id(query.quiz_id.as_deref(), "quiz-id")?;
    let summary = quiz_summary(&*store, user.id, quiz_id).await?;
    Ok(Json(summary))
}

/// Global leaderboard ("toppliste") with the caller's own placement.
pub async fn toppliste(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(leaderboard(&*store, user.id, None).await?))
}

pub async fn profile(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let placement = user_placement(&*store, user.id).await?;

    Ok(Json(ProfileResponse {
        id: user.id,
        username: user.username,
        role: user.role,
        accepted_terms: user.accepted_terms,
        opt_in_ranking: user.opt_in_ranking,
        created_at: user.created_at,
        placement,
    }))
}

/// Terms status page. Reachable before the terms are accepted.
pub async fn accept_terms_page(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> impl IntoResponse {
    Json(json!({
        "accepted_terms": user.accepted_terms,
        "accept_with": "POST /api/v1/quiz/accept-terms (accepted-terms=on)",
    }))
}

/// Ranking, optionally scoped to a label, plus the caller's entry in it.
pub(crate) async fn leaderboard(
    store: &dyn QuizStore,
    user_id: i64,
    label_id: Option<i64>,
) -> Result<LeaderboardResponse, AppError> {
    let entries = ranking(store, label_id).await?;
    let me = entries.iter().find(|e| e.user_id == user_id).cloned();

    Ok(LeaderboardResponse {
        label_id,
        ranking: entries,
        me,
    })
}
