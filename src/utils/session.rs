// src/utils/session.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::{HeaderMap, header};
use cookie::{Cookie, SameSite, time::Duration};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

/// Name of the cookie carrying the signed session.
pub const SESSION_COOKIE: &str = "session";

/// Name of the cookie remembering where to go after logging in.
pub const REDIRECT_COOKIE: &str = "redirect-after-login";

/// Payload of the session token. Only the user id is kept; the role is
/// looked up again on every request.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: i64,
    /// Issued at, Unix timestamp.
    pub iat: u64,
    /// Expiration time, Unix timestamp.
    pub exp: u64,
}

/// Signing keys and cookie settings for sessions.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: u64,
    secure: bool,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_seconds: u64, secure: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
            secure,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.session_secret, config.session_ttl, config.cookie_secure)
    }

    /// Signs a new session for the user.
    pub fn sign_session(&self, user_id: i64) -> Result<String, AppError> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
            .as_secs();

        let data = SessionData {
            user_id,
            iat,
            exp: iat + self.ttl_seconds,
        };

        encode(&Header::new(Algorithm::HS256), &data, &self.encoding)
            .map_err(|e| AppError::InternalServerError(e.to_string()))
    }

    /// Verifies and decodes a session token.
    /// Tampered, expired or malformed tokens are all an `AuthError`.
    pub fn verify_session(&self, token: &str) -> Result<SessionData, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "iat"]);

        let token_data = decode::<SessionData>(token, &self.decoding, &validation)
            .map_err(|_| AppError::AuthError("Invalid session".to_string()))?;

        Ok(token_data.claims)
    }

    /// Session cookie from the request headers, if any and valid.
    pub fn session_from_headers(&self, headers: &HeaderMap) -> Option<SessionData> {
        let token = read_cookie(headers, SESSION_COOKIE)?;
        self.verify_session(&token).ok()
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(Duration::seconds(self.ttl_seconds as i64))
            .build()
    }

    pub fn clear_session_cookie(&self) -> Cookie<'static> {
        removal(SESSION_COOKIE, self.secure)
    }

    /// Remembers the path a logged-out visitor asked for. Send it with
    /// `.encoded()` so a `;` in the query cannot end the value.
    pub fn redirect_cookie(&self, path: &str) -> Cookie<'static> {
        Cookie::build((REDIRECT_COOKIE, path.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build()
    }

    pub fn clear_redirect_cookie(&self) -> Cookie<'static> {
        removal(REDIRECT_COOKIE, self.secure)
    }
}

fn removal(name: &'static str, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, "")).path("/").http_only(true).secure(secure).build();
    cookie.make_removal();
    cookie
}

/// Value of the named cookie from the `Cookie` request headers, percent-decoded.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse_encoded(value.to_string()))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}
