// src/models/mod.rs

pub mod article;
pub mod guest;
pub mod label;
pub mod question;
pub mod quiz;
pub mod user;
pub mod user_answer;
