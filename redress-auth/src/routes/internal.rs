use axum::extract::{Path, State};
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use redress_shared::errors::{AppError, AppResult, ErrorCode};
use redress_shared::types::auth::UserRole;
use redress_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{Credential, NewCredential};
use crate::schema::{credentials, refresh_tokens};
use crate::services::auth_service;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedUserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
}

/// POST /internal/users — create an identity with an explicit role
/// (service-to-service, no auth; used by the provisioning side-channel).
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<Json<ApiResponse<CreatedUserResponse>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    auth_service::validate_password(&req.password)?;

    let role: UserRole = req
        .role
        .parse()
        .map_err(|e: String| AppError::new(ErrorCode::UnknownRole, e))?;

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let exists: bool = credentials::table
        .filter(credentials::email.eq(&req.email.to_lowercase()))
        .count()
        .get_result::<i64>(&mut conn)
        .map(|c| c > 0)
        .unwrap_or(false);

    if exists {
        return Err(AppError::new(ErrorCode::EmailAlreadyExists, "email already registered"));
    }

    let password_hash = auth_service::hash_password(&req.password)?;

    let new_cred = NewCredential {
        name: req.name.trim().to_string(),
        email: req.email.to_lowercase(),
        password_hash,
        role: role.to_string(),
    };

    let credential: Credential = diesel::insert_into(credentials::table)
        .values(&new_cred)
        .get_result(&mut conn)?;

    publisher::publish_user_registered(
        &state.rabbitmq,
        credential.id,
        &credential.name,
        &credential.email,
        role,
    )
    .await;

    tracing::info!(user_id = %credential.id, role = %role, "user provisioned");

    Ok(Json(ApiResponse::ok(CreatedUserResponse {
        id: credential.id,
        email: credential.email,
        name: credential.name,
        role: credential.role,
    })))
}

/// DELETE /internal/users/:id — remove an identity again
/// (service-to-service, no auth; compensating action when a later
/// provisioning step fails).
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    diesel::delete(refresh_tokens::table.filter(refresh_tokens::credential_id.eq(user_id)))
        .execute(&mut conn)?;

    let deleted = diesel::delete(credentials::table.find(user_id)).execute(&mut conn)?;

    if deleted == 0 {
        return Err(AppError::new(ErrorCode::NotFound, "user not found"));
    }

    tracing::info!(user_id = %user_id, "user deleted (provisioning rollback)");

    Ok(Json(ApiResponse::ok(serde_json::json!({ "deleted": true }))))
}
