// src/handlers/auth.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{AppendHeaders, IntoResponse},
};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{CreateUserRequest, LoginRequest, NewUser, Role},
    store::QuizStore,
    utils::{
        hash::{hash_password, verify_password},
        session::{REDIRECT_COOKIE, SessionKeys, read_cookie},
    },
};

/// Landing page after login when nothing else was requested.
const DEFAULT_AFTER_LOGIN: &str = "/quiz";

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(store): State<Arc<dyn QuizStore>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = store
        .create_user(NewUser {
            username: payload.username.trim().to_string(),
            password_hash: hashed_password,
            role: Role::User,
        })
        .await?;

    tracing::info!(user_id = user.id, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Verifies the credentials and starts a session.
///
/// The session travels in an http-only cookie. The body names where the
/// client should go next: the page that sent it to login, or `/quiz`.
pub async fn login(
    State(store): State<Arc<dyn QuizStore>>,
    State(sessions): State<SessionKeys>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = store
        .get_user_by_username(payload.username.trim())
        .await?
        .ok_or(AppError::AuthError("Invalid username or password".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Invalid username or password".to_string()));
    }

    let token = sessions.sign_session(user.id)?;

    let redirect = read_cookie(&headers, REDIRECT_COOKIE)
        .filter(|target| is_local_path(target))
        .unwrap_or_else(|| DEFAULT_AFTER_LOGIN.to_string());

    tracing::info!(user_id = user.id, "User logged in");

    Ok((
        AppendHeaders([
            (header::SET_COOKIE, sessions.session_cookie(token).to_string()),
            (header::SET_COOKIE, sessions.clear_redirect_cookie().to_string()),
        ]),
        Json(json!({
            "redirect": redirect,
            "role": user.role,
            "accepted_terms": user.accepted_terms,
        })),
    ))
}

/// Ends the session by clearing the cookie.
pub async fn logout(State(sessions): State<SessionKeys>) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, sessions.clear_session_cookie().to_string())],
    )
}

/// Where unauthenticated visitors are sent.
pub async fn login_page() -> impl IntoResponse {
    Json(json!({
        "message": "Log in with POST /auth/login",
    }))
}

pub async fn forbidden_page() -> impl IntoResponse {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": "You do not have access to this page",
        })),
    )
}

/// Only same-site absolute paths are followed after login.
fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_local_paths_are_followed() {
        assert!(is_local_path("/quiz/play?quiz-id=1"));
        assert!(!is_local_path("//evil.example.com"));
        assert!(!is_local_path("https://evil.example.com"));
        assert!(!is_local_path("/\\evil.example.com"));
    }
}
