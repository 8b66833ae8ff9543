use axum::extract::{Path, State};
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use redress_shared::errors::{AppError, AppResult, ErrorCode};
use redress_shared::middleware::SuperAdminUser;
use redress_shared::types::auth::UserRole;
use redress_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::Credential;
use crate::schema::credentials;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

/// PUT /admin/users/:id/role - promote or demote a user (super admin only)
pub async fn set_role(
    State(state): State<Arc<AppState>>,
    admin: SuperAdminUser,
    Path(user_id): Path<Uuid>,
    Json(req): Json<SetRoleRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let role: UserRole = req
        .role
        .parse()
        .map_err(|e: String| AppError::new(ErrorCode::UnknownRole, e))?;

    if user_id == admin.0.id {
        return Err(AppError::new(ErrorCode::Forbidden, "cannot change your own role"));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let credential: Credential = credentials::table
        .find(user_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::NotFound, "user not found"))?;

    diesel::update(credentials::table.find(user_id))
        .set((
            credentials::role.eq(role.to_string()),
            credentials::updated_at.eq(chrono::Utc::now()),
        ))
        .execute(&mut conn)?;

    publisher::publish_role_changed(&state.rabbitmq, user_id, role).await;

    tracing::info!(
        user_id = %user_id,
        old_role = %credential.role,
        new_role = %role,
        changed_by = %admin.0.id,
        "role changed"
    );

    Ok(Json(ApiResponse::ok(serde_json::json!({
        "user_id": user_id,
        "role": role,
    }))))
}
