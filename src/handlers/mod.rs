// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod guest;
pub mod organization_admin;
pub mod quiz;
pub mod quiz_api;

use crate::error::AppError;

/// Parses a required numeric id from a query or form value.
pub(crate) fn parse_id(raw: Option<&str>, name: &str) -> Result<i64, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("missing '{}'", name)))?;

    raw.parse::<i64>()
        .map_err(|_| AppError::BadRequest(format!("'{}' must be a number", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_present_and_numeric() {
        assert_eq!(parse_id(Some(" 12 "), "quiz-id").unwrap(), 12);
        assert!(parse_id(None, "quiz-id").is_err());
        assert!(parse_id(Some(""), "quiz-id").is_err());
        assert!(parse_id(Some("abc"), "quiz-id").is_err());
    }
}
