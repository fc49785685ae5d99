// src/services/guest.rs

//! Play without an account. Guests get one quiz, the most recently ended
//! published one, and their answers are scored but never written to the
//! ledger.

use chrono::{DateTime, Utc};

use crate::{
    error::QuizError,
    models::{
        guest::{GuestAnswer, GuestChoice},
        question::Question,
        quiz::{PartialQuiz, Quiz},
        user_answer::{AnsweredQuestion, QuizPlay, QuizSummary},
    },
    store::QuizStore,
};

/// The quiz offered to guests: published, not deleted, already closed, with
/// the latest closing time.
pub async fn guest_quiz(store: &dyn QuizStore, now: DateTime<Utc>) -> Result<Quiz, QuizError> {
    store
        .list_quizzes(true)
        .await?
        .into_iter()
        .filter(|q| q.available_from < now && q.available_to < now)
        .max_by_key(|q| q.available_to)
        .ok_or(QuizError::NoSuchQuiz)
}

/// Serves question `number` (1-based arrangement) of the guest quiz.
///
/// The time limit starts at `now` on every request since nothing remembers
/// when a guest first saw the question.
pub async fn question_by_number(
    store: &dyn QuizStore,
    quiz_id: i64,
    number: i32,
    now: DateTime<Utc>,
) -> Result<QuizPlay, QuizError> {
    let quiz = guest_quiz(store, now).await?;
    if quiz.id != quiz_id {
        return Err(QuizError::NoSuchQuiz);
    }

    let questions = store.list_questions(quiz_id).await?;
    if questions.is_empty() {
        return Err(QuizError::NoSuchQuiz);
    }

    let question = questions
        .into_iter()
        .find(|q| q.arrangement == number)
        .ok_or(QuizError::NoSuchQuestion)?;
    if question.alternatives.is_empty() {
        tracing::error!(question_id = question.id, quiz_id, "Question has no alternatives");
        return Err(QuizError::MissingAlternatives(question.id));
    }

    let stats = store.quiz_stats(quiz_id).await?;

    Ok(QuizPlay {
        quiz: PartialQuiz {
            id: quiz.id,
            title: quiz.title,
            image_url: quiz.image_url,
            available_to: quiz.available_to,
            question_count: stats.question_count,
        },
        remaining_seconds: question.remaining_seconds(now, now),
        question_number: question.arrangement,
        question: question.to_public(),
        presented_at: now,
    })
}

/// Scores a guest's answer without touching the store.
pub async fn score_guest_answer(
    store: &dyn QuizStore,
    question_id: i64,
    alternative_id: i64,
    now: DateTime<Utc>,
) -> Result<GuestAnswer, QuizError> {
    let question = store
        .get_question(question_id)
        .await?
        .ok_or(QuizError::NoSuchQuestion)?;

    let quiz = guest_quiz(store, now).await?;
    if question.quiz_id != quiz.id {
        return Err(QuizError::NotOpenToGuests);
    }

    let answered = answered_row(&question, alternative_id)?;
    let questions = store.list_questions(quiz.id).await?;
    let next_question_number = questions
        .iter()
        .map(|q| q.arrangement)
        .filter(|&n| n > question.arrangement)
        .min();

    tracing::debug!(question_id, is_correct = answered.is_correct, "Guest answer scored");

    Ok(GuestAnswer {
        correct_alternative_ids: question.correct_alternative_ids(),
        quiz_completed: next_question_number.is_none(),
        next_question_number,
        answered,
    })
}

/// Summary of a guest run, scored again from the choices the client kept.
///
/// Every question of the quiz needs a choice. Repeated choices for the same
/// question count once, the first one wins.
pub async fn guest_summary(
    store: &dyn QuizStore,
    quiz_id: i64,
    choices: &[GuestChoice],
    now: DateTime<Utc>,
) -> Result<QuizSummary, QuizError> {
    let quiz = guest_quiz(store, now).await?;
    if quiz.id != quiz_id {
        return Err(QuizError::NoSuchQuiz);
    }

    let questions = store.list_questions(quiz_id).await?;
    if questions.is_empty() {
        return Err(QuizError::NoSuchQuiz);
    }
    if choices
        .iter()
        .any(|c| !questions.iter().any(|q| q.id == c.question_id))
    {
        return Err(QuizError::NotOpenToGuests);
    }

    let mut answered_questions = Vec::with_capacity(questions.len());
    for question in &questions {
        let choice = choices
            .iter()
            .find(|c| c.question_id == question.id)
            .ok_or(QuizError::QuizNotCompleted)?;
        answered_questions.push(answered_row(question, choice.alternative_id)?);
    }

    let max_score = questions.iter().map(|q| i64::from(q.points)).sum();
    let achieved_score = answered_questions
        .iter()
        .map(|a| i64::from(a.points_awarded))
        .sum();
    let has_articles_to_show = answered_questions.iter().any(|a| a.article_id.is_some());

    Ok(QuizSummary {
        quiz_id: quiz.id,
        quiz_title: quiz.title,
        quiz_available_to: quiz.available_to,
        max_score,
        achieved_score,
        answered_questions,
        has_articles_to_show,
    })
}

fn answered_row(question: &Question, alternative_id: i64) -> Result<AnsweredQuestion, QuizError> {
    let alternative = question
        .alternatives
        .iter()
        .find(|a| a.id == alternative_id)
        .ok_or(QuizError::InvalidAlternative)?;

    Ok(AnsweredQuestion {
        question_id: question.id,
        question_text: question.text.clone(),
        max_points: question.points,
        chosen_alternative_id: alternative.id,
        chosen_alternative_text: alternative.text.clone(),
        is_correct: alternative.is_correct,
        points_awarded: if alternative.is_correct { question.points } else { 0 },
        article_id: question.article_id,
    })
}
