// src/services/scoring.rs

use crate::{
    error::QuizError,
    models::user_answer::{QuizSummary, RankingEntry, RankingRow},
    store::QuizStore,
};

/// Result of a quiz the user has answered completely.
pub async fn quiz_summary(
    store: &dyn QuizStore,
    user_id: i64,
    quiz_id: i64,
) -> Result<QuizSummary, QuizError> {
    let quiz = store
        .get_quiz(quiz_id)
        .await?
        .filter(|q| !q.is_deleted)
        .ok_or(QuizError::NoSuchQuiz)?;

    let stats = store.quiz_stats(quiz_id).await?;
    if stats.question_count == 0 {
        return Err(QuizError::NoSuchQuiz);
    }

    let answered_questions = store.answered_questions(user_id, quiz_id).await?;
    if (answered_questions.len() as i64) < stats.question_count {
        return Err(QuizError::QuizNotCompleted);
    }

    let achieved_score = answered_questions
        .iter()
        .map(|a| i64::from(a.points_awarded))
        .sum();
    let has_articles_to_show = answered_questions.iter().any(|a| a.article_id.is_some());

    Ok(QuizSummary {
        quiz_id: quiz.id,
        quiz_title: quiz.title,
        quiz_available_to: quiz.available_to,
        max_score: stats.max_score,
        achieved_score,
        answered_questions,
        has_articles_to_show,
    })
}

/// Orders rows by points, highest first, ties by ascending user id, and
/// numbers them from 1.
pub fn rank_entries(mut rows: Vec<RankingRow>) -> Vec<RankingEntry> {
    rows.sort_by(|a, b| b.points.cmp(&a.points).then(a.user_id.cmp(&b.user_id)));
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| RankingEntry {
            placement: i + 1,
            user_id: row.user_id,
            username: row.username,
            points: row.points,
        })
        .collect()
}

/// Leaderboard of opted-in users, optionally limited to quizzes with a label.
pub async fn ranking(
    store: &dyn QuizStore,
    label_id: Option<i64>,
) -> Result<Vec<RankingEntry>, QuizError> {
    if let Some(id) = label_id {
        store.get_label(id).await?.ok_or(QuizError::NoSuchLabel)?;
    }
    let rows = store.ranking(label_id).await?;
    Ok(rank_entries(rows))
}

/// The user's own entry on the global leaderboard.
pub async fn user_placement(
    store: &dyn QuizStore,
    user_id: i64,
) -> Result<Option<RankingEntry>, QuizError> {
    let entries = ranking(store, None).await?;
    Ok(entries.into_iter().find(|e| e.user_id == user_id))
}
