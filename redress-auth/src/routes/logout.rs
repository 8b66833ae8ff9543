use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use redress_shared::errors::{AppError, AppResult};
use redress_shared::types::auth::AuthUser;
use redress_shared::types::ApiResponse;

use crate::schema::refresh_tokens;
use crate::services::token_service;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

/// Revokes the presented refresh token, or every active token for the
/// caller when none is given.
pub async fn logout(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<LogoutRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    let now = chrono::Utc::now();

    match req.refresh_token {
        Some(token) => {
            let token_hash = token_service::hash_token(&token);
            diesel::update(
                refresh_tokens::table
                    .filter(refresh_tokens::credential_id.eq(user.id))
                    .filter(refresh_tokens::token_hash.eq(&token_hash))
                    .filter(refresh_tokens::revoked_at.is_null()),
            )
            .set(refresh_tokens::revoked_at.eq(Some(now)))
            .execute(&mut conn)?;
        }
        None => {
            diesel::update(
                refresh_tokens::table
                    .filter(refresh_tokens::credential_id.eq(user.id))
                    .filter(refresh_tokens::revoked_at.is_null()),
            )
            .set(refresh_tokens::revoked_at.eq(Some(now)))
            .execute(&mut conn)?;
        }
    }

    tracing::info!(user_id = %user.id, "user logged out");

    Ok(Json(ApiResponse::ok(serde_json::json!({ "logged_out": true }))))
}
