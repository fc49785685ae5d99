// tests/store_contract_tests.rs
//
// The same checks run against every `QuizStore` backend. The PostgreSQL run
// needs DATABASE_URL and is skipped without it.

use std::sync::Arc;

use chrono::{Duration, Utc};
use newsquiz::{
    error::{QuizError, StoreError},
    models::{
        question::{NewAlternative, NewQuestion, Question},
        quiz::{NewQuiz, Quiz, QuizUpdate},
        user::{NewUser, Role, User},
        user_answer::RecordedAnswer,
    },
    services::{next_question_in_quiz, submit_answer},
    store::{MemoryStore, PgStore, QuizStore},
};
use sqlx::postgres::PgPoolOptions;

fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..12])
}

async fn pg_store() -> Option<PgStore> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping PostgreSQL contract run");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    Some(PgStore::new(pool))
}

async fn user(store: &dyn QuizStore) -> User {
    store
        .create_user(NewUser {
            username: unique("user"),
            password_hash: "hash".to_string(),
            role: Role::User,
        })
        .await
        .unwrap()
}

async fn quiz(store: &dyn QuizStore) -> Quiz {
    let mut new = NewQuiz::with_defaults(Utc::now());
    new.published = true;
    store.create_quiz(new).await.unwrap()
}

async fn question(store: &dyn QuizStore, quiz_id: i64, points: i32) -> Question {
    store
        .create_question(NewQuestion {
            quiz_id,
            text: unique("question"),
            image_url: None,
            article_id: None,
            points,
            time_limit_seconds: Some(30),
            alternatives: vec![
                NewAlternative {
                    text: "Riktig".to_string(),
                    is_correct: true,
                },
                NewAlternative {
                    text: "Feil".to_string(),
                    is_correct: false,
                },
            ],
        })
        .await
        .unwrap()
}

/// Presents and answers a question with its first (correct) or second alternative.
async fn answer(store: &dyn QuizStore, user_id: i64, q: &Question, correct: bool) {
    let now = Utc::now();
    store.present_question(user_id, q.id, now).await.unwrap();
    let alternative = if correct { &q.alternatives[0] } else { &q.alternatives[1] };
    let written = store
        .record_answer(RecordedAnswer {
            user_id,
            question_id: q.id,
            alternative_id: alternative.id,
            points_awarded: if correct { q.points } else { 0 },
            answered_at: now,
        })
        .await
        .unwrap();
    assert!(written);
}

fn arrangement(questions: &[Question]) -> Vec<(i64, i32)> {
    questions.iter().map(|q| (q.id, q.arrangement)).collect()
}

// Contracts

async fn usernames_are_unique(store: &dyn QuizStore) {
    let first = user(store).await;

    let duplicate = store
        .create_user(NewUser {
            username: first.username.clone(),
            password_hash: "other".to_string(),
            role: Role::QuizAdmin,
        })
        .await;
    assert!(matches!(duplicate, Err(StoreError::Conflict(_))));

    let found = store.get_user_by_username(&first.username).await.unwrap().unwrap();
    assert_eq!(found.id, first.id);
    assert!(!found.accepted_terms);
    assert!(found.opt_in_ranking);

    let promoted = store
        .set_role_by_username(&first.username, Role::QuizAdmin)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(promoted.role, Role::QuizAdmin);
    assert!(store.set_role_by_username(&unique("ghost"), Role::User).await.unwrap().is_none());
}

async fn questions_keep_a_gapless_order(store: &dyn QuizStore) {
    let quiz = quiz(store).await;
    let a = question(store, quiz.id, 10).await;
    let b = question(store, quiz.id, 20).await;
    let c = question(store, quiz.id, 30).await;
    assert_eq!(
        arrangement(&store.list_questions(quiz.id).await.unwrap()),
        vec![(a.id, 1), (b.id, 2), (c.id, 3)]
    );

    let stats = store.quiz_stats(quiz.id).await.unwrap();
    assert_eq!(stats.question_count, 3);
    assert_eq!(stats.max_score, 60);

    assert_eq!(store.delete_question(b.id).await.unwrap(), Some(quiz.id));
    assert_eq!(store.delete_question(b.id).await.unwrap(), None);
    assert_eq!(
        arrangement(&store.list_questions(quiz.id).await.unwrap()),
        vec![(a.id, 1), (c.id, 2)]
    );

    store.rearrange_questions(quiz.id, &[c.id, a.id]).await.unwrap();
    assert_eq!(
        arrangement(&store.list_questions(quiz.id).await.unwrap()),
        vec![(c.id, 1), (a.id, 2)]
    );

    let partial = store.rearrange_questions(quiz.id, &[c.id]).await;
    assert!(matches!(partial, Err(StoreError::Invalid(_))));

    // Appending continues after the current last position
    let d = question(store, quiz.id, 10).await;
    assert_eq!(d.arrangement, 3);
    assert_eq!(d.alternatives.len(), 2);
    assert!(d.alternatives[0].is_correct);
}

async fn quiz_updates_respect_the_window(store: &dyn QuizStore) {
    let quiz = quiz(store).await;

    let inverted = store
        .update_quiz(
            quiz.id,
            QuizUpdate {
                available_to: Some(quiz.available_from - Duration::days(1)),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(inverted, Err(StoreError::Invalid(_))));

    let renamed = store
        .update_quiz(
            quiz.id,
            QuizUpdate {
                title: Some("Påskequiz".to_string()),
                image_url: Some(Some("https://example.com/egg.png".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.title, "Påskequiz");
    assert_eq!(renamed.available_to, quiz.available_to);

    assert!(store.soft_delete_quiz(quiz.id).await.unwrap());
    assert!(store.get_quiz(quiz.id).await.unwrap().unwrap().is_deleted);
    assert!(
        store
            .update_quiz(quiz.id, QuizUpdate::default())
            .await
            .unwrap()
            .is_none()
    );
}

async fn a_question_is_presented_and_answered_once(store: &dyn QuizStore) {
    let player = user(store).await;
    let quiz = quiz(store).await;
    let first = question(store, quiz.id, 10).await;
    let second = question(store, quiz.id, 10).await;

    assert_eq!(
        store.next_unpresented_question_id(player.id, quiz.id).await.unwrap(),
        Some(first.id)
    );

    // Answering something never presented writes nothing
    let unpresented = store
        .record_answer(RecordedAnswer {
            user_id: player.id,
            question_id: first.id,
            alternative_id: first.alternatives[0].id,
            points_awarded: 10,
            answered_at: Utc::now(),
        })
        .await
        .unwrap();
    assert!(!unpresented);

    let presented_at = store.present_question(player.id, first.id, Utc::now()).await.unwrap();
    let again = store
        .present_question(player.id, first.id, Utc::now() + Duration::seconds(5))
        .await
        .unwrap();
    assert_eq!(presented_at, again);

    let in_progress = store.in_progress_question(player.id, quiz.id).await.unwrap().unwrap();
    assert_eq!(in_progress.question_id, first.id);
    assert!(!in_progress.is_answered());
    assert_eq!(
        store.next_unpresented_question_id(player.id, quiz.id).await.unwrap(),
        Some(second.id)
    );

    let answer_first = RecordedAnswer {
        user_id: player.id,
        question_id: first.id,
        alternative_id: first.alternatives[0].id,
        points_awarded: 10,
        answered_at: Utc::now(),
    };
    assert!(store.record_answer(answer_first).await.unwrap());
    assert!(!store.record_answer(answer_first).await.unwrap());
    assert!(store.in_progress_question(player.id, quiz.id).await.unwrap().is_none());

    let row = store.get_user_answer(player.id, first.id).await.unwrap().unwrap();
    assert_eq!(row.chosen_answer_alternative_id, Some(first.alternatives[0].id));
    assert_eq!(row.points_awarded, 10);

    assert!(!store.completed_quiz_ids(player.id).await.unwrap().contains(&quiz.id));
    answer(store, player.id, &second, false).await;
    assert!(store.completed_quiz_ids(player.id).await.unwrap().contains(&quiz.id));

    let answered = store.answered_questions(player.id, quiz.id).await.unwrap();
    let ids: Vec<i64> = answered.iter().map(|a| a.question_id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
    assert!(answered[0].is_correct);
    assert!(!answered[1].is_correct);
    assert_eq!(answered[1].chosen_alternative_text, "Feil");
}

async fn ranking_counts_opted_in_players(store: &dyn QuizStore) {
    let alice = user(store).await;
    let bob = user(store).await;
    let hidden = user(store).await;
    let sport = quiz(store).await;
    let other = quiz(store).await;
    let sport_question = question(store, sport.id, 10).await;
    let other_question = question(store, other.id, 20).await;

    let label = store.create_label(&unique("sport")).await.unwrap();
    assert!(store.attach_label(sport.id, label.id).await.unwrap());
    assert!(!store.attach_label(sport.id, label.id).await.unwrap());

    answer(store, alice.id, &sport_question, true).await;
    answer(store, bob.id, &sport_question, false).await;
    answer(store, bob.id, &other_question, true).await;
    answer(store, hidden.id, &other_question, true).await;
    store.set_opt_in_ranking(hidden.id, false).await.unwrap();

    let ours = |rows: Vec<newsquiz::models::user_answer::RankingRow>| -> Vec<(i64, i64)> {
        let mut rows: Vec<(i64, i64)> = rows
            .into_iter()
            .filter(|r| [alice.id, bob.id, hidden.id].contains(&r.user_id))
            .map(|r| (r.user_id, r.points))
            .collect();
        rows.sort_unstable();
        rows
    };

    assert_eq!(
        ours(store.ranking(None).await.unwrap()),
        vec![(alice.id, 10), (bob.id, 20)]
    );
    // Bob answered wrong in the labelled quiz but still has a row there
    assert_eq!(
        ours(store.ranking(Some(label.id)).await.unwrap()),
        vec![(alice.id, 10), (bob.id, 0)]
    );

    // Deleting a player removes their answers from the ranking
    assert!(store.delete_user(alice.id).await.unwrap());
    assert_eq!(ours(store.ranking(None).await.unwrap()), vec![(bob.id, 20)]);

    assert!(store.detach_label(sport.id, label.id).await.unwrap());
    assert!(store.labels_for_quiz(sport.id).await.unwrap().is_empty());
}

async fn racing_requests_are_settled_once(store: Arc<dyn QuizStore>) {
    let player = user(&*store).await;
    let quiz = quiz(&*store).await;
    let first = question(&*store, quiz.id, 10).await;
    let second = question(&*store, quiz.id, 10).await;
    let (user_id, quiz_id) = (player.id, quiz.id);
    let now = Utc::now();

    // Two tabs ask for the next question at once
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
    assert_eq!(a.question.id, first.id);
    assert_eq!(b.question.id, first.id);
    assert_eq!(a.presented_at, b.presented_at);
    let presented_at = a.presented_at;
    assert_eq!(
        store.next_unpresented_question_id(user_id, quiz_id).await.unwrap(),
        Some(second.id)
    );

    // ... and then both submit an answer
    let question_id = first.id;
    let (right, wrong) = (first.alternatives[0].id, first.alternatives[1].id);
    let (a, b) = tokio::join!(
        tokio::spawn({
            let store = store.clone();
            async move { submit_answer(&*store, user_id, question_id, right, now).await }
        }),
        tokio::spawn({
            let store = store.clone();
            async move { submit_answer(&*store, user_id, question_id, wrong, now).await }
        }),
    );
    let (winner, loser) = match (a.unwrap(), b.unwrap()) {
        (Ok(outcome), Err(err)) | (Err(err), Ok(outcome)) => (outcome, err),
        other => panic!("expected exactly one accepted answer, got {other:?}"),
    };
    assert!(matches!(loser, QuizError::AlreadyAnswered));

    let row = store.get_user_answer(user_id, question_id).await.unwrap().unwrap();
    assert_eq!(row.question_presented_at, presented_at);
    assert_eq!(row.chosen_answer_alternative_id, Some(winner.chosen_alternative_id));
    assert_eq!(row.points_awarded, winner.points_awarded);
}

async fn run_all(store: Arc<dyn QuizStore>) {
    usernames_are_unique(&*store).await;
    questions_keep_a_gapless_order(&*store).await;
    quiz_updates_respect_the_window(&*store).await;
    a_question_is_presented_and_answered_once(&*store).await;
    ranking_counts_opted_in_players(&*store).await;
    racing_requests_are_settled_once(store).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn memory_store_honours_the_contract() {
    run_all(Arc::new(MemoryStore::new())).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn postgres_store_honours_the_contract() {
    let Some(store) = pg_store().await else {
        return;
    };
    run_all(Arc::new(store)).await;
}
