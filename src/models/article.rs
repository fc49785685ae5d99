// src/models/article.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use validator::Validate;

/// Represents the 'articles' table in the database.
/// Questions may link the news article they are about.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Article {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for registering an article.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateArticleRequest {
    #[validate(length(min = 1, max = 500), custom(function = validate_url_string))]
    pub url: String,
    #[validate(length(min = 1, max = 300))]
    pub title: String,
}

/// Validates that a string is a correctly formatted URL.
fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}
