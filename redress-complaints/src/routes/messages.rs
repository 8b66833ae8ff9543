use axum::extract::{Path, Query, State};
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use redress_shared::errors::{AppError, AppResult, ErrorCode};
use redress_shared::types::api::ApiResponse;
use redress_shared::types::auth::AuthUser;
use redress_shared::types::pagination::{Paginated, PaginationParams};

use crate::events::publisher;
use crate::models::{Message, NewMessage};
use crate::policy::Scope;
use crate::schema::complaint_messages;
use crate::store;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageCountResponse {
    pub count: i64,
}

/// GET /complaints/:id/messages - conversation in send order, paginated
pub async fn list_messages(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(complaint_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Message>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    // Read access doubles as conversation membership
    let scope = Scope::load(&mut conn, &user)?;
    store::get_complaint(&mut conn, &user, &scope, complaint_id)?;

    let items = complaint_messages::table
        .filter(complaint_messages::complaint_id.eq(complaint_id))
        .order(complaint_messages::created_at.asc())
        .offset(params.offset() as i64)
        .limit(params.limit() as i64)
        .load::<Message>(&mut conn)?;

    let total: i64 = complaint_messages::table
        .filter(complaint_messages::complaint_id.eq(complaint_id))
        .count()
        .get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

/// GET /complaints/:id/messages/count
pub async fn message_count(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(complaint_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MessageCountResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let scope = Scope::load(&mut conn, &user)?;
    store::get_complaint(&mut conn, &user, &scope, complaint_id)?;

    let count: i64 = complaint_messages::table
        .filter(complaint_messages::complaint_id.eq(complaint_id))
        .count()
        .get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(MessageCountResponse { count })))
}

/// POST /complaints/:id/messages - owner or in-scope staff. `is_admin` is
/// snapshotted from the sender's role at send time and never re-evaluated.
pub async fn send_message(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(complaint_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<Json<ApiResponse<Message>>> {
    if req.message.trim().is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "message must not be empty"));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let scope = Scope::load(&mut conn, &user)?;
    let complaint = store::get_complaint(&mut conn, &user, &scope, complaint_id)?;

    let message: Message = diesel::insert_into(complaint_messages::table)
        .values(&NewMessage {
            complaint_id,
            sender_id: user.id,
            is_admin: user.role.is_staff(),
            message: req.message.trim().to_string(),
        })
        .get_result(&mut conn)?;

    publisher::publish_message_sent(&state.rabbitmq, &complaint, user.id).await;

    Ok(Json(ApiResponse::ok(message)))
}
