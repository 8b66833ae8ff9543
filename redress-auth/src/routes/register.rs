use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use redress_shared::errors::{AppError, AppResult, ErrorCode};
use redress_shared::types::auth::{TokenPair, UserRole};
use redress_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{Credential, NewCredential, NewRefreshToken};
use crate::schema::{credentials, refresh_tokens};
use crate::services::{auth_service, token_service};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    pub password: String,
}

/// Self-service signup. Everyone who registers here is a student; staff
/// accounts come from role promotion or the provisioning side-channel.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    auth_service::validate_password(&req.password)?;

    let password_hash = auth_service::hash_password(&req.password)?;
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    // Check if email already exists
    let exists: bool = credentials::table
        .filter(credentials::email.eq(&req.email.to_lowercase()))
        .count()
        .get_result::<i64>(&mut conn)
        .map(|c| c > 0)
        .unwrap_or(false);

    if exists {
        return Err(AppError::new(ErrorCode::EmailAlreadyExists, "email already registered"));
    }

    let new_cred = NewCredential {
        name: req.name.trim().to_string(),
        email: req.email.to_lowercase(),
        password_hash,
        role: UserRole::Student.to_string(),
    };

    let credential: Credential = diesel::insert_into(credentials::table)
        .values(&new_cred)
        .get_result(&mut conn)?;

    let (token_pair, refresh_hash) = token_service::create_token_pair(
        credential.id,
        UserRole::Student,
        &state.config.jwt_secret,
        state.config.jwt_access_ttl,
    )?;

    let new_rt = NewRefreshToken {
        credential_id: credential.id,
        token_hash: refresh_hash,
        device_fingerprint: None,
        expires_at: chrono::Utc::now() + chrono::Duration::seconds(state.config.jwt_refresh_ttl),
    };
    diesel::insert_into(refresh_tokens::table)
        .values(&new_rt)
        .execute(&mut conn)?;

    publisher::publish_user_registered(
        &state.rabbitmq,
        credential.id,
        &credential.name,
        &credential.email,
        UserRole::Student,
    )
    .await;

    tracing::info!(user_id = %credential.id, "student registered");

    Ok(Json(ApiResponse::ok(token_pair)))
}
