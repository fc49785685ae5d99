// src/models/user.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use validator::Validate;

use super::user_answer::RankingEntry;

/// Role of a user. Stored as text in the `users.role` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    QuizAdmin,
    OrganizationAdmin,
}

/// Administrators: may use the dashboard and the admin API.
pub const ADMIN_ROLES: &[Role] = &[Role::QuizAdmin, Role::OrganizationAdmin];

/// Only organization admins may manage other users' roles.
pub const ORGANIZATION_ADMIN_ROLES: &[Role] = &[Role::OrganizationAdmin];

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::QuizAdmin => "quiz_admin",
            Role::OrganizationAdmin => "organization_admin",
        }
    }

    pub fn is_administrator(&self) -> bool {
        matches!(self, Role::QuizAdmin | Role::OrganizationAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "quiz_admin" => Ok(Role::QuizAdmin),
            "organization_admin" => Ok(Role::OrganizationAdmin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username, shown on leaderboards.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    #[sqlx(try_from = "String")]
    pub role: Role,

    /// Whether the user has accepted the terms of service.
    pub accepted_terms: bool,

    /// Whether the user appears on public leaderboards.
    pub opt_in_ranking: bool,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Data needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

/// Profile of the current user, with their leaderboard placement.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub accepted_terms: bool,
    pub opt_in_ranking: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub placement: Option<RankingEntry>,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for an organization admin assigning a role.
#[derive(Debug, Deserialize, Validate)]
pub struct SetRoleRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    pub role: Role,
}
