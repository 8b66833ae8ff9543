use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use redress_shared::errors::{AppError, AppResult, ErrorCode};
use redress_shared::types::auth::AuthUser;
use redress_shared::types::ApiResponse;

use crate::models::Credential;
use crate::schema::credentials;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
}

pub async fn me(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<MeResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let credential: Credential = credentials::table
        .find(user.id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::NotFound, "account not found"))?;

    Ok(Json(ApiResponse::ok(MeResponse {
        id: credential.id,
        name: credential.name,
        email: credential.email,
        role: credential.role,
    })))
}
