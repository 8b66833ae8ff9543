use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use redress_shared::errors::{AppError, AppResult, ErrorCode};
use redress_shared::middleware::StaffUser;
use redress_shared::types::api::ApiResponse;
use redress_shared::types::pagination::{Paginated, PaginationParams};

use crate::events::publisher;
use crate::lifecycle::{ComplaintStatus, Priority};
use crate::models::{Complaint, NewNote, Note};
use crate::policy::{self, Scope};
use crate::schema::{complaint_notes, complaints, profiles};
use crate::store;
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct ComplaintFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category_id: Option<Uuid>,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

impl ComplaintFilterParams {
    fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPriorityRequest {
    pub priority: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub admin_id: Uuid,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetDeadlineRequest {
    pub deadline: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddNoteRequest {
    pub note: String,
}

#[derive(Debug, Serialize)]
pub struct NoteWithAuthorName {
    #[serde(flatten)]
    pub note: Note,
    pub admin_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub resolved: i64,
    pub rejected: i64,
    pub filed_today: i64,
}

// --- Helpers ---

/// Apply the caller's category scope to a complaints query. Category admins
/// only ever see complaints in their assigned categories; uncategorized
/// rows are excluded for them.
macro_rules! scoped_complaints {
    ($scope:expr) => {{
        let mut query = complaints::table.into_boxed();
        match $scope {
            Scope::All => {}
            Scope::Categories(set) => {
                // NULL category_id never matches an IN list, so
                // uncategorized complaints stay invisible here.
                let ids: Vec<Uuid> = set.iter().copied().collect();
                query = query.filter(complaints::category_id.eq_any(ids));
            }
            Scope::None => {
                query = query.filter(diesel::dsl::sql::<diesel::sql_types::Bool>("false"));
            }
        }
        query
    }};
}

// --- List complaints (paginated, scope-restricted, optional filters) ---

pub async fn list_complaints(
    State(state): State<Arc<AppState>>,
    StaffUser(user): StaffUser,
    Query(params): Query<ComplaintFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<Complaint>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    let scope = Scope::load(&mut conn, &user)?;

    // Validate filters up front so typos fail loudly instead of matching
    // nothing.
    if let Some(ref s) = params.status {
        s.parse::<ComplaintStatus>()
            .map_err(|e| AppError::new(ErrorCode::ValidationError, e))?;
    }
    if let Some(ref p) = params.priority {
        p.parse::<Priority>()
            .map_err(|e| AppError::new(ErrorCode::ValidationError, e))?;
    }

    let pagination = params.pagination();

    let mut query = scoped_complaints!(&scope);
    let mut count_query = scoped_complaints!(&scope);

    if let Some(ref status) = params.status {
        query = query.filter(complaints::status.eq(status.clone()));
        count_query = count_query.filter(complaints::status.eq(status.clone()));
    }
    if let Some(ref priority) = params.priority {
        query = query.filter(complaints::priority.eq(priority.clone()));
        count_query = count_query.filter(complaints::priority.eq(priority.clone()));
    }
    if let Some(category_id) = params.category_id {
        query = query.filter(complaints::category_id.eq(category_id));
        count_query = count_query.filter(complaints::category_id.eq(category_id));
    }

    let items = query
        .order(complaints::created_at.desc())
        .offset(pagination.offset() as i64)
        .limit(pagination.limit() as i64)
        .load::<Complaint>(&mut conn)?;

    let total: i64 = count_query.count().get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &pagination))))
}

// --- Status / priority / assignment / deadline mutations ---

pub async fn set_status(
    State(state): State<Arc<AppState>>,
    StaffUser(user): StaffUser,
    Path(complaint_id): Path<Uuid>,
    Json(req): Json<SetStatusRequest>,
) -> AppResult<Json<ApiResponse<Complaint>>> {
    let new_status: ComplaintStatus = req
        .status
        .parse()
        .map_err(|e: String| AppError::new(ErrorCode::ValidationError, e))?;

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    let scope = Scope::load(&mut conn, &user)?;

    let (complaint, entry) = store::set_status(&mut conn, &user, &scope, complaint_id, new_status)?;

    if entry.is_some() {
        publisher::publish_complaint_updated(&state.rabbitmq, &complaint, user.id).await;
        tracing::info!(
            complaint_id = %complaint_id,
            status = %new_status,
            changed_by = %user.id,
            "status changed"
        );
    }

    Ok(Json(ApiResponse::ok(complaint)))
}

pub async fn set_priority(
    State(state): State<Arc<AppState>>,
    StaffUser(user): StaffUser,
    Path(complaint_id): Path<Uuid>,
    Json(req): Json<SetPriorityRequest>,
) -> AppResult<Json<ApiResponse<Complaint>>> {
    let new_priority: Priority = req
        .priority
        .parse()
        .map_err(|e: String| AppError::new(ErrorCode::ValidationError, e))?;

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    let scope = Scope::load(&mut conn, &user)?;

    let (complaint, entry) = store::set_priority(&mut conn, &user, &scope, complaint_id, new_priority)?;

    if entry.is_some() {
        publisher::publish_complaint_updated(&state.rabbitmq, &complaint, user.id).await;
    }

    Ok(Json(ApiResponse::ok(complaint)))
}

pub async fn assign_complaint(
    State(state): State<Arc<AppState>>,
    StaffUser(user): StaffUser,
    Path(complaint_id): Path<Uuid>,
    Json(req): Json<AssignRequest>,
) -> AppResult<Json<ApiResponse<Complaint>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    let scope = Scope::load(&mut conn, &user)?;

    let (complaint, _entry) =
        store::assign(&mut conn, &user, &scope, complaint_id, req.admin_id, req.note)?;

    publisher::publish_complaint_updated(&state.rabbitmq, &complaint, user.id).await;

    tracing::info!(
        complaint_id = %complaint_id,
        assigned_to = %req.admin_id,
        assigned_by = %user.id,
        "complaint assigned"
    );

    Ok(Json(ApiResponse::ok(complaint)))
}

pub async fn set_deadline(
    State(state): State<Arc<AppState>>,
    StaffUser(user): StaffUser,
    Path(complaint_id): Path<Uuid>,
    Json(req): Json<SetDeadlineRequest>,
) -> AppResult<Json<ApiResponse<Complaint>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    let scope = Scope::load(&mut conn, &user)?;

    let (complaint, _audit) =
        store::set_deadline(&mut conn, &user, &scope, complaint_id, req.deadline, req.note)?;

    publisher::publish_complaint_updated(&state.rabbitmq, &complaint, user.id).await;

    Ok(Json(ApiResponse::ok(complaint)))
}

pub async fn delete_complaint(
    State(state): State<Arc<AppState>>,
    StaffUser(user): StaffUser,
    Path(complaint_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    let scope = Scope::load(&mut conn, &user)?;

    let complaint = store::delete_complaint(&mut conn, &user, &scope, complaint_id)?;

    publisher::publish_complaint_deleted(&state.rabbitmq, &complaint, user.id).await;

    tracing::info!(complaint_id = %complaint_id, deleted_by = %user.id, "complaint deleted");

    Ok(Json(ApiResponse::ok(serde_json::json!({ "deleted": true }))))
}

// --- Notes ---

pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    StaffUser(user): StaffUser,
    Path(complaint_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<NoteWithAuthorName>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    let scope = Scope::load(&mut conn, &user)?;

    let complaint = store::get_complaint(&mut conn, &user, &scope, complaint_id)?;
    if !policy::can_write(&user, &scope, &complaint) {
        return Err(AppError::new(ErrorCode::Forbidden, "you do not have scope over this complaint"));
    }

    let notes = complaint_notes::table
        .filter(complaint_notes::complaint_id.eq(complaint_id))
        .left_join(profiles::table)
        .select((complaint_notes::all_columns, profiles::name.nullable()))
        .order(complaint_notes::created_at.desc())
        .load::<(Note, Option<String>)>(&mut conn)?
        .into_iter()
        .map(|(note, admin_name)| NoteWithAuthorName { note, admin_name })
        .collect();

    Ok(Json(ApiResponse::ok(notes)))
}

pub async fn add_note(
    State(state): State<Arc<AppState>>,
    StaffUser(user): StaffUser,
    Path(complaint_id): Path<Uuid>,
    Json(req): Json<AddNoteRequest>,
) -> AppResult<Json<ApiResponse<Note>>> {
    if req.note.trim().is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "note must not be empty"));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    let scope = Scope::load(&mut conn, &user)?;

    let complaint = store::get_complaint(&mut conn, &user, &scope, complaint_id)?;
    if !policy::can_write(&user, &scope, &complaint) {
        return Err(AppError::new(ErrorCode::Forbidden, "you do not have scope over this complaint"));
    }

    let note: Note = diesel::insert_into(complaint_notes::table)
        .values(&NewNote {
            complaint_id,
            admin_id: user.id,
            note: req.note.trim().to_string(),
        })
        .get_result(&mut conn)?;

    publisher::publish_note_added(&state.rabbitmq, &complaint, user.id).await;

    Ok(Json(ApiResponse::ok(note)))
}

/// Note deletion requires authorship, not scope.
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    StaffUser(user): StaffUser,
    Path(note_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let note: Note = complaint_notes::table
        .find(note_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::NoteNotFound, "note not found"))?;

    if note.admin_id != user.id {
        return Err(AppError::new(ErrorCode::NotNoteAuthor, "only the author may delete a note"));
    }

    diesel::delete(complaint_notes::table.find(note_id)).execute(&mut conn)?;

    let complaint: Option<Complaint> = complaints::table
        .find(note.complaint_id)
        .first(&mut conn)
        .optional()?;
    if let Some(complaint) = complaint {
        publisher::publish_note_deleted(&state.rabbitmq, &complaint, user.id).await;
    }

    Ok(Json(ApiResponse::ok(serde_json::json!({ "deleted": true }))))
}

// --- Dashboard stats ---

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    StaffUser(user): StaffUser,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    let scope = Scope::load(&mut conn, &user)?;

    let total: i64 = scoped_complaints!(&scope).count().get_result(&mut conn)?;

    let pending: i64 = scoped_complaints!(&scope)
        .filter(complaints::status.eq(ComplaintStatus::Pending.as_str()))
        .count()
        .get_result(&mut conn)?;

    let in_progress: i64 = scoped_complaints!(&scope)
        .filter(complaints::status.eq_any(vec![
            ComplaintStatus::Verified.as_str(),
            ComplaintStatus::Assigned.as_str(),
            ComplaintStatus::InProgress.as_str(),
        ]))
        .count()
        .get_result(&mut conn)?;

    let resolved: i64 = scoped_complaints!(&scope)
        .filter(complaints::status.eq_any(vec![
            ComplaintStatus::Resolved.as_str(),
            ComplaintStatus::Closed.as_str(),
        ]))
        .count()
        .get_result(&mut conn)?;

    let rejected: i64 = scoped_complaints!(&scope)
        .filter(complaints::status.eq(ComplaintStatus::Rejected.as_str()))
        .count()
        .get_result(&mut conn)?;

    let today_start = Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap();
    let filed_today: i64 = scoped_complaints!(&scope)
        .filter(complaints::created_at.ge(today_start.and_utc()))
        .count()
        .get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(DashboardStats {
        total,
        pending,
        in_progress,
        resolved,
        rejected,
        filed_today,
    })))
}
