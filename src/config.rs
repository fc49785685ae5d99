// src/config.rs

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. Without it the in-memory store is used.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub session_secret: String,
    /// Session lifetime in seconds.
    pub session_ttl: u64,
    pub cookie_secure: bool,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    /// Extra origins allowed to embed the app in a frame.
    pub allowed_frame_ancestors: String,
}

impl Config {
    /// Defaults for everything but the session secret.
    pub fn new(session_secret: impl Into<String>) -> Self {
        Self {
            database_url: None,
            database_max_connections: 5,
            session_secret: session_secret.into(),
            session_ttl: 60 * 60 * 24 * 7,
            cookie_secure: false,
            rust_log: "info".to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            admin_username: None,
            admin_password: None,
            allowed_frame_ancestors: String::new(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 5)?;

        let session_secret =
            env::var("SESSION_SECRET").map_err(|_| ConfigError::Missing("SESSION_SECRET"))?;

        let session_ttl = parse_or("SESSION_TTL_SECONDS", 60 * 60 * 24 * 7)?;

        let cookie_secure = parse_or("COOKIE_SECURE", false)?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = parse_or("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?;

        let admin_username = env::var("ADMIN_USERNAME").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        let allowed_frame_ancestors = env::var("ALLOWED_FRAME_ANCESTORS").unwrap_or_default();

        Ok(Self {
            database_url,
            database_max_connections,
            session_secret,
            session_ttl,
            cookie_secure,
            rust_log,
            bind_addr,
            admin_username,
            admin_password,
            allowed_frame_ancestors,
        })
    }

    /// Value of the `Content-Security-Policy` header sent with every response.
    pub fn content_security_policy(&self) -> String {
        let ancestors = self.allowed_frame_ancestors.trim();
        if ancestors.is_empty() {
            "frame-ancestors 'self'".to_string()
        } else {
            format!("frame-ancestors 'self' {}", ancestors)
        }
    }
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_ancestors(ancestors: &str) -> Config {
        Config {
            allowed_frame_ancestors: ancestors.to_string(),
            ..Config::new("secret")
        }
    }

    #[test]
    fn csp_defaults_to_self() {
        let config = config_with_ancestors("");
        assert_eq!(config.content_security_policy(), "frame-ancestors 'self'");
    }

    #[test]
    fn csp_appends_extra_ancestors() {
        let config = config_with_ancestors(" https://news.example.com ");
        assert_eq!(
            config.content_security_policy(),
            "frame-ancestors 'self' https://news.example.com"
        );
    }
}
