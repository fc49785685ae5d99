// src/handlers/organization_admin.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError, middleware::CurrentUser, models::user::SetRoleRequest, store::QuizStore,
};

/// Lists all users in the system, newest first.
pub async fn list_users(
    State(store): State<Arc<dyn QuizStore>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_users().await?))
}

/// Gives the named user a new role.
pub async fn set_role(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Json(payload): Json<SetRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = store
        .set_role_by_username(payload.username.trim(), payload.role)
        .await?
        .ok_or(AppError::NotFound(format!(
            "User '{}' not found",
            payload.username
        )))?;

    tracing::info!(
        admin_id = admin.id,
        user_id = user.id,
        role = %user.role,
        "Role changed"
    );
    Ok(Json(user))
}
