// src/services/mod.rs

//! Quiz rules on top of the storage seam. Every operation takes the store
//! and the current time explicitly so it can be driven from tests.

pub mod guest;
pub mod progression;
pub mod scoring;

pub use progression::{next_question_in_quiz, submit_answer};
pub use scoring::{quiz_summary, rank_entries, ranking, user_placement};
