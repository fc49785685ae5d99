// src/services/progression.rs

use chrono::{DateTime, Utc};

use crate::{
    error::QuizError,
    models::{
        quiz::PartialQuiz,
        user_answer::{AnswerOutcome, QuizPlay, RecordedAnswer},
    },
    store::QuizStore,
};

/// Serves the question the user should see next in a quiz.
///
/// Questions are served one at a time in arrangement order. A question that
/// was presented but not answered stays current and is returned again with
/// its original presentation time. Otherwise the first question without a
/// ledger row is presented now.
pub async fn next_question_in_quiz(
    store: &dyn QuizStore,
    user_id: i64,
    quiz_id: i64,
    now: DateTime<Utc>,
) -> Result<QuizPlay, QuizError> {
    let quiz = store
        .get_quiz(quiz_id)
        .await?
        .filter(|q| q.published && !q.is_deleted)
        .ok_or(QuizError::NoSuchQuiz)?;

    let stats = store.quiz_stats(quiz_id).await?;
    if stats.question_count == 0 {
        return Err(QuizError::NoSuchQuiz);
    }

    let (question_id, presented_at) = match store.in_progress_question(user_id, quiz_id).await? {
        Some(row) => (row.question_id, Some(row.question_presented_at)),
        None => {
            let id = store
                .next_unpresented_question_id(user_id, quiz_id)
                .await?
                .ok_or(QuizError::NoMoreQuestions)?;
            (id, None)
        }
    };

    let question = store
        .get_question(question_id)
        .await?
        .ok_or(QuizError::NoSuchQuestion)?;

    if question.alternatives.is_empty() {
        tracing::error!(question_id, quiz_id, "Question has no alternatives");
        return Err(QuizError::MissingAlternatives(question_id));
    }

    let presented_at = match presented_at {
        Some(at) => at,
        None => {
            let at = store.present_question(user_id, question_id, now).await?;
            tracing::debug!(user_id, question_id, "Question presented");
            at
        }
    };

    Ok(QuizPlay {
        quiz: PartialQuiz {
            id: quiz.id,
            title: quiz.title,
            image_url: quiz.image_url,
            available_to: quiz.available_to,
            question_count: stats.question_count,
        },
        remaining_seconds: question.remaining_seconds(presented_at, now),
        question_number: question.arrangement,
        question: question.to_public(),
        presented_at,
    })
}

/// Records the user's answer to a presented question.
///
/// The time limit is advisory: late answers are accepted and scored.
pub async fn submit_answer(
    store: &dyn QuizStore,
    user_id: i64,
    question_id: i64,
    alternative_id: i64,
    now: DateTime<Utc>,
) -> Result<AnswerOutcome, QuizError> {
    let question = store
        .get_question(question_id)
        .await?
        .ok_or(QuizError::NoSuchQuestion)?;

    let row = store
        .get_user_answer(user_id, question_id)
        .await?
        .ok_or(QuizError::QuestionNotPresented)?;
    if row.is_answered() {
        return Err(QuizError::AlreadyAnswered);
    }

    let is_correct = question
        .is_answer_correct(alternative_id)
        .ok_or(QuizError::InvalidAlternative)?;
    let points_awarded = if is_correct { question.points } else { 0 };

    let written = store
        .record_answer(RecordedAnswer {
            user_id,
            question_id,
            alternative_id,
            points_awarded,
            answered_at: now,
        })
        .await?;
    if !written {
        // A concurrent submission got there first.
        return Err(QuizError::AlreadyAnswered);
    }

    let next_question_id = store
        .next_unpresented_question_id(user_id, question.quiz_id)
        .await?;
    let stats = store.quiz_stats(question.quiz_id).await?;
    let answered = store.answered_questions(user_id, question.quiz_id).await?;

    tracing::info!(user_id, question_id, is_correct, points_awarded, "Answer recorded");

    Ok(AnswerOutcome {
        question_id,
        chosen_alternative_id: alternative_id,
        is_correct,
        points_awarded,
        correct_alternative_ids: question.correct_alternative_ids(),
        next_question_id,
        quiz_completed: answered.len() as i64 >= stats.question_count,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::{
        models::quiz::QuizUpdate,
        services::test_support::{correct, published_quiz, question, user, wrong},
        store::MemoryStore,
    };

    #[tokio::test]
    async fn serves_questions_in_arrangement_order_without_repeats() {
        // Arrange
        let store = MemoryStore::new();
        let now = Utc::now();
        let player = user(&store, "ola").await;
        let quiz = published_quiz(&store, now).await;
        let mut questions = Vec::new();
        for _ in 0..3 {
            questions.push(question(&store, quiz.id, 10).await);
        }

        // Act & Assert
        for expected in &questions {
            let play = next_question_in_quiz(&store, player.id, quiz.id, now).await.unwrap();
            assert_eq!(play.question.id, expected.id);
            assert_eq!(play.question_number, expected.arrangement);
            assert_eq!(play.quiz.question_count, 3);
            submit_answer(&store, player.id, expected.id, correct(expected), now)
                .await
                .unwrap();
        }

        let err = next_question_in_quiz(&store, player.id, quiz.id, now).await.unwrap_err();
        assert!(matches!(err, QuizError::NoMoreQuestions));
    }

    #[tokio::test]
    async fn repeated_call_returns_the_same_presentation() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let player = user(&store, "kari").await;
        let quiz = published_quiz(&store, now).await;
        let first = question(&store, quiz.id, 10).await;
        question(&store, quiz.id, 10).await;

        let a = next_question_in_quiz(&store, player.id, quiz.id, now).await.unwrap();
        let later = now + Duration::seconds(12);
        let b = next_question_in_quiz(&store, player.id, quiz.id, later).await.unwrap();

        assert_eq!(a.question.id, first.id);
        assert_eq!(b.question.id, first.id);
        assert_eq!(a.presented_at, b.presented_at);
        assert_eq!(b.remaining_seconds, Some(18));

        // Only the first question has a ledger row.
        let second = store.next_unpresented_question_id(player.id, quiz.id).await.unwrap();
        assert!(second.is_some_and(|id| id != first.id));
    }

    #[tokio::test]
    async fn unknown_unpublished_deleted_or_empty_quiz_is_no_such_quiz() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let player = user(&store, "per").await;

        let err = next_question_in_quiz(&store, player.id, 999, now).await.unwrap_err();
        assert!(matches!(err, QuizError::NoSuchQuiz));

        let empty = published_quiz(&store, now).await;
        let err = next_question_in_quiz(&store, player.id, empty.id, now).await.unwrap_err();
        assert!(matches!(err, QuizError::NoSuchQuiz));

        let draft = published_quiz(&store, now).await;
        question(&store, draft.id, 10).await;
        store
            .update_quiz(
                draft.id,
                QuizUpdate {
                    published: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let err = next_question_in_quiz(&store, player.id, draft.id, now).await.unwrap_err();
        assert!(matches!(err, QuizError::NoSuchQuiz));

        let deleted = published_quiz(&store, now).await;
        question(&store, deleted.id, 10).await;
        store.soft_delete_quiz(deleted.id).await.unwrap();
        let err = next_question_in_quiz(&store, player.id, deleted.id, now).await.unwrap_err();
        assert!(matches!(err, QuizError::NoSuchQuiz));
    }

    #[tokio::test]
    async fn public_question_hides_correctness() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let player = user(&store, "nora").await;
        let quiz = published_quiz(&store, now).await;
        question(&store, quiz.id, 10).await;

        let play = next_question_in_quiz(&store, player.id, quiz.id, now).await.unwrap();
        let json = serde_json::to_value(&play).unwrap();

        assert_eq!(json["question"]["alternatives"].as_array().unwrap().len(), 2);
        assert!(!json.to_string().contains("is_correct"));
    }

    #[tokio::test]
    async fn answering_a_question_never_presented_scores_nothing() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let player = user(&store, "lars").await;
        let quiz = published_quiz(&store, now).await;
        let q = question(&store, quiz.id, 10).await;

        let err = submit_answer(&store, player.id, q.id, correct(&q), now).await.unwrap_err();

        assert!(matches!(err, QuizError::QuestionNotPresented));
        assert!(store.get_user_answer(player.id, q.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_answer_is_rejected_and_points_unchanged() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let player = user(&store, "ida").await;
        let quiz = published_quiz(&store, now).await;
        let q = question(&store, quiz.id, 10).await;
        next_question_in_quiz(&store, player.id, quiz.id, now).await.unwrap();

        let first = submit_answer(&store, player.id, q.id, wrong(&q), now).await.unwrap();
        let err = submit_answer(&store, player.id, q.id, correct(&q), now).await.unwrap_err();

        assert_eq!(first.points_awarded, 0);
        assert!(matches!(err, QuizError::AlreadyAnswered));
        let row = store.get_user_answer(player.id, q.id).await.unwrap().unwrap();
        assert_eq!(row.points_awarded, 0);
        assert_eq!(row.chosen_answer_alternative_id, Some(wrong(&q)));
    }

    #[tokio::test]
    async fn foreign_alternative_is_invalid() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let player = user(&store, "emil").await;
        let quiz = published_quiz(&store, now).await;
        let q1 = question(&store, quiz.id, 10).await;
        let q2 = question(&store, quiz.id, 10).await;
        next_question_in_quiz(&store, player.id, quiz.id, now).await.unwrap();

        let err = submit_answer(&store, player.id, q1.id, correct(&q2), now).await.unwrap_err();

        assert!(matches!(err, QuizError::InvalidAlternative));
        let row = store.get_user_answer(player.id, q1.id).await.unwrap().unwrap();
        assert!(!row.is_answered());
    }

    #[tokio::test]
    async fn unknown_question_is_reported() {
        let store = MemoryStore::new();
        let player = user(&store, "sara").await;

        let err = submit_answer(&store, player.id, 4242, 1, Utc::now()).await.unwrap_err();

        assert!(matches!(err, QuizError::NoSuchQuestion));
    }

    #[tokio::test]
    async fn outcome_reports_feedback_and_completion() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let player = user(&store, "jonas").await;
        let quiz = published_quiz(&store, now).await;
        let q1 = question(&store, quiz.id, 10).await;
        let q2 = question(&store, quiz.id, 20).await;

        next_question_in_quiz(&store, player.id, quiz.id, now).await.unwrap();
        let first = submit_answer(&store, player.id, q1.id, correct(&q1), now).await.unwrap();
        assert!(first.is_correct);
        assert_eq!(first.points_awarded, 10);
        assert_eq!(first.correct_alternative_ids, vec![correct(&q1)]);
        assert_eq!(first.next_question_id, Some(q2.id));
        assert!(!first.quiz_completed);

        next_question_in_quiz(&store, player.id, quiz.id, now).await.unwrap();
        let late = now + Duration::minutes(5);
        let second = submit_answer(&store, player.id, q2.id, correct(&q2), late).await.unwrap();
        assert_eq!(second.points_awarded, 20);
        assert_eq!(second.next_question_id, None);
        assert!(second.quiz_completed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn simultaneous_plays_share_one_presentation() {
        // Arrange
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let player = user(&store, "eva").await;
        let quiz = published_quiz(&store, now).await;
        let first = question(&store, quiz.id, 10).await;
        let second = question(&store, quiz.id, 10).await;
        let (user_id, quiz_id) = (player.id, quiz.id);

        // Act
        let (a, b) = tokio::join!(
            tokio::spawn({
                let store = store.clone();
                async move { next_question_in_quiz(&*store, user_id, quiz_id, now).await }
            }),
            tokio::spawn({
                let store = store.clone();
                let later = now + Duration::seconds(1);
                async move { next_question_in_quiz(&*store, user_id, quiz_id, later).await }
            }),
        );
        let (a, b) = (a.unwrap().unwrap(), b.unwrap().unwrap());

        // Assert
        assert_eq!(a.question.id, first.id);
        assert_eq!(b.question.id, first.id);
        assert_eq!(a.presented_at, b.presented_at);
        let row = store.get_user_answer(user_id, first.id).await.unwrap().unwrap();
        assert_eq!(row.question_presented_at, a.presented_at);
        assert_eq!(
            store.next_unpresented_question_id(user_id, quiz_id).await.unwrap(),
            Some(second.id)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn simultaneous_answers_are_recorded_once() {
        // Arrange
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let player = user(&store, "tor").await;
        let quiz = published_quiz(&store, now).await;
        let q = question(&store, quiz.id, 10).await;
        next_question_in_quiz(&*store, player.id, quiz.id, now).await.unwrap();
        let (user_id, question_id) = (player.id, q.id);
        let (right, wrong_id) = (correct(&q), wrong(&q));

        // Act
        let (a, b) = tokio::join!(
            tokio::spawn({
                let store = store.clone();
                async move { submit_answer(&*store, user_id, question_id, right, now).await }
            }),
            tokio::spawn({
                let store = store.clone();
                async move { submit_answer(&*store, user_id, question_id, wrong_id, now).await }
            }),
        );

        // Assert
        let (winner, loser) = match (a.unwrap(), b.unwrap()) {
            (Ok(outcome), Err(err)) | (Err(err), Ok(outcome)) => (outcome, err),
            other => panic!("expected exactly one accepted answer, got {other:?}"),
        };
        assert!(matches!(loser, QuizError::AlreadyAnswered));
        let row = store.get_user_answer(user_id, question_id).await.unwrap().unwrap();
        assert_eq!(row.chosen_answer_alternative_id, Some(winner.chosen_alternative_id));
        assert_eq!(row.points_awarded, winner.points_awarded);
    }
}
