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
use crate::lifecycle::Priority;
use crate::models::{AttachmentRef, Complaint, HistoryEntry, Note};
use crate::policy::Scope;
use crate::store::{self, NewComplaintInput};
use crate::schema::{complaint_history, complaint_notes, complaints, profiles};
use crate::timeline::{self, HistoryWithActor, NoteWithAuthor, StageTimeline, TimelineItem};
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct CreateComplaintRequest {
    pub title: String,
    pub description: String,
    pub priority: String,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
}

#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    /// "stages" (default) or "flat"
    pub view: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TimelineResponse {
    Stages(StageTimeline),
    Flat(Vec<TimelineItem>),
}

// --- Handlers ---

/// POST /complaints - file a new complaint (initial status: pending)
pub async fn create_complaint(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateComplaintRequest>,
) -> AppResult<Json<ApiResponse<Complaint>>> {
    let priority: Priority = req
        .priority
        .parse()
        .map_err(|e: String| AppError::new(ErrorCode::ValidationError, e))?;

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let complaint = store::create_complaint(
        &mut conn,
        &user,
        NewComplaintInput {
            title: req.title,
            description: req.description,
            priority,
            category_id: req.category_id,
            attachments: req.attachments,
        },
    )?;

    publisher::publish_complaint_created(&state.rabbitmq, &complaint, user.id).await;

    tracing::info!(complaint_id = %complaint.id, user_id = %user.id, "complaint filed");

    Ok(Json(ApiResponse::ok(complaint)))
}

/// GET /complaints - the caller's own complaints, newest first
pub async fn list_my_complaints(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Complaint>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let items = complaints::table
        .filter(complaints::user_id.eq(user.id))
        .order(complaints::created_at.desc())
        .offset(params.offset() as i64)
        .limit(params.limit() as i64)
        .load::<Complaint>(&mut conn)?;

    let total: i64 = complaints::table
        .filter(complaints::user_id.eq(user.id))
        .count()
        .get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

/// GET /complaints/:id - owner or staff with scope
pub async fn get_complaint(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(complaint_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Complaint>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let scope = Scope::load(&mut conn, &user)?;
    let complaint = store::get_complaint(&mut conn, &user, &scope, complaint_id)?;

    Ok(Json(ApiResponse::ok(complaint)))
}

/// GET /complaints/:id/timeline - stage-grouped by default, ?view=flat for
/// the chronological feed
pub async fn get_timeline(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(complaint_id): Path<Uuid>,
    Query(query): Query<TimelineQuery>,
) -> AppResult<Json<ApiResponse<TimelineResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let scope = Scope::load(&mut conn, &user)?;
    let complaint = store::get_complaint(&mut conn, &user, &scope, complaint_id)?;

    let history: Vec<HistoryWithActor> = complaint_history::table
        .filter(complaint_history::complaint_id.eq(complaint_id))
        .left_join(profiles::table)
        .select((complaint_history::all_columns, profiles::name.nullable()))
        .order(complaint_history::created_at.asc())
        .load::<(HistoryEntry, Option<String>)>(&mut conn)?
        .into_iter()
        .map(|(entry, actor_name)| HistoryWithActor { entry, actor_name })
        .collect();

    let notes: Vec<NoteWithAuthor> = complaint_notes::table
        .filter(complaint_notes::complaint_id.eq(complaint_id))
        .left_join(profiles::table)
        .select((complaint_notes::all_columns, profiles::name.nullable()))
        .order(complaint_notes::created_at.asc())
        .load::<(Note, Option<String>)>(&mut conn)?
        .into_iter()
        .map(|(note, author_name)| NoteWithAuthor { note, author_name })
        .collect();

    let response = match query.view.as_deref() {
        Some("flat") => TimelineResponse::Flat(timeline::flat_timeline(history, notes)),
        _ => {
            let status = complaint
                .status
                .parse()
                .map_err(|e: String| AppError::internal(format!("stored status corrupt: {e}")))?;
            TimelineResponse::Stages(timeline::stage_timeline(status, &history, &notes))
        }
    };

    Ok(Json(ApiResponse::ok(response)))
}
