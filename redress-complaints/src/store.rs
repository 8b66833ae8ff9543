// Complaint store.
//
// Single writer path for complaint state. Every mutation checks the access
// policy first, then applies the write and its paired history row inside
// one transaction, so a complaint row and its ledger can never diverge.
// Status/priority checks are evaluated against the row read in the same
// transaction; concurrent writers resolve last-write-wins.

use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use redress_shared::errors::{AppError, AppResult, ErrorCode};
use redress_shared::types::auth::AuthUser;

use crate::lifecycle::{plan_transition, ChangeType, ComplaintStatus, Priority, TransitionPlan};
use crate::models::{
    AttachmentRef, Complaint, HistoryEntry, NewComplaint, NewHistoryEntry, NewNote, Note, Profile,
};
use crate::policy::{self, Scope};
use crate::schema::{
    admin_category_assignments, categories, complaint_history, complaint_messages,
    complaint_notes, complaints, profiles,
};

pub const MAX_ATTACHMENTS: usize = 5;

pub struct NewComplaintInput {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub category_id: Option<Uuid>,
    pub attachments: Vec<AttachmentRef>,
}

fn load_complaint(conn: &mut PgConnection, id: Uuid) -> AppResult<Complaint> {
    complaints::table
        .find(id)
        .first::<Complaint>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ComplaintNotFound, "complaint not found"))
}

/// Reads behave like row-level security: a complaint outside the caller's
/// scope is indistinguishable from a missing one.
pub fn get_complaint(
    conn: &mut PgConnection,
    user: &AuthUser,
    scope: &Scope,
    id: Uuid,
) -> AppResult<Complaint> {
    let complaint = load_complaint(conn, id)?;
    if !policy::can_read(user, scope, &complaint) {
        return Err(AppError::new(ErrorCode::ComplaintNotFound, "complaint not found"));
    }
    Ok(complaint)
}

fn require_write(user: &AuthUser, scope: &Scope, complaint: &Complaint) -> AppResult<()> {
    if !policy::can_write(user, scope, complaint) {
        return Err(AppError::new(
            ErrorCode::Forbidden,
            "you do not have scope over this complaint",
        ));
    }
    Ok(())
}

/// Create a complaint at `pending`, atomically paired with its `created`
/// history row.
pub fn create_complaint(
    conn: &mut PgConnection,
    owner: &AuthUser,
    input: NewComplaintInput,
) -> AppResult<Complaint> {
    if input.title.trim().is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "title must not be empty"));
    }
    if input.description.trim().is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "description must not be empty"));
    }
    if input.attachments.len() > MAX_ATTACHMENTS {
        return Err(AppError::new(
            ErrorCode::AttachmentLimitExceeded,
            format!("at most {MAX_ATTACHMENTS} attachments per complaint"),
        ));
    }

    if let Some(category_id) = input.category_id {
        let exists: i64 = categories::table
            .filter(categories::id.eq(category_id))
            .count()
            .get_result(conn)?;
        if exists == 0 {
            return Err(AppError::new(ErrorCode::CategoryNotFound, "category not found"));
        }
    }

    let new_complaint = NewComplaint {
        title: input.title.trim().to_string(),
        description: input.description.trim().to_string(),
        priority: input.priority.to_string(),
        status: ComplaintStatus::Pending.to_string(),
        category_id: input.category_id,
        user_id: owner.id,
        attachments: serde_json::to_value(&input.attachments)
            .map_err(|e| AppError::internal(format!("attachment serialization failed: {e}")))?,
    };

    conn.transaction::<Complaint, AppError, _>(|conn| {
        let complaint: Complaint = diesel::insert_into(complaints::table)
            .values(&new_complaint)
            .get_result(conn)?;

        diesel::insert_into(complaint_history::table)
            .values(&NewHistoryEntry {
                complaint_id: complaint.id,
                change_type: ChangeType::Created.to_string(),
                old_value: None,
                new_value: Some(ComplaintStatus::Pending.to_string()),
                note: None,
                changed_by: owner.id,
            })
            .execute(conn)?;

        Ok(complaint)
    })
}

/// Move a complaint along the status track. Returns the updated complaint
/// and the history row, or `None` history when the call was an idempotent
/// repeat of the current status.
pub fn set_status(
    conn: &mut PgConnection,
    staff: &AuthUser,
    scope: &Scope,
    id: Uuid,
    new_status: ComplaintStatus,
) -> AppResult<(Complaint, Option<HistoryEntry>)> {
    conn.transaction::<(Complaint, Option<HistoryEntry>), AppError, _>(|conn| {
        let complaint = load_complaint(conn, id)?;
        require_write(staff, scope, &complaint)?;

        let current = complaint
            .status
            .parse::<ComplaintStatus>()
            .map_err(|e| AppError::internal(format!("stored status corrupt: {e}")))?;

        let plan = plan_transition(current, new_status)
            .map_err(|e| AppError::new(ErrorCode::InvalidTransition, e.to_string()))?;

        let (from, to) = match plan {
            TransitionPlan::NoOp => return Ok((complaint, None)),
            TransitionPlan::Apply { from, to } => (from, to),
        };

        let updated: Complaint = diesel::update(complaints::table.find(id))
            .set((
                complaints::status.eq(to.to_string()),
                complaints::updated_at.eq(Utc::now()),
            ))
            .get_result(conn)?;

        let entry: HistoryEntry = diesel::insert_into(complaint_history::table)
            .values(&NewHistoryEntry {
                complaint_id: id,
                change_type: ChangeType::StatusChange.to_string(),
                old_value: Some(from.to_string()),
                new_value: Some(to.to_string()),
                note: None,
                changed_by: staff.id,
            })
            .get_result(conn)?;

        Ok((updated, Some(entry)))
    })
}

/// Change priority with the same pairing contract as `set_status`.
pub fn set_priority(
    conn: &mut PgConnection,
    staff: &AuthUser,
    scope: &Scope,
    id: Uuid,
    new_priority: Priority,
) -> AppResult<(Complaint, Option<HistoryEntry>)> {
    conn.transaction::<(Complaint, Option<HistoryEntry>), AppError, _>(|conn| {
        let complaint = load_complaint(conn, id)?;
        require_write(staff, scope, &complaint)?;

        if complaint.priority == new_priority.to_string() {
            return Ok((complaint, None));
        }
        let old = complaint.priority.clone();

        let updated: Complaint = diesel::update(complaints::table.find(id))
            .set((
                complaints::priority.eq(new_priority.to_string()),
                complaints::updated_at.eq(Utc::now()),
            ))
            .get_result(conn)?;

        let entry: HistoryEntry = diesel::insert_into(complaint_history::table)
            .values(&NewHistoryEntry {
                complaint_id: id,
                change_type: ChangeType::PriorityChange.to_string(),
                old_value: Some(old),
                new_value: Some(new_priority.to_string()),
                note: None,
                changed_by: staff.id,
            })
            .get_result(conn)?;

        Ok((updated, Some(entry)))
    })
}

/// The assignment target must itself have scope over the complaint's
/// category: admin/super_admin always, category_admin via an assignment row.
fn target_has_scope(
    conn: &mut PgConnection,
    target: &Profile,
    category_id: Option<Uuid>,
) -> AppResult<bool> {
    let role = target
        .role
        .parse::<redress_shared::types::auth::UserRole>()
        .map_err(|e| AppError::internal(format!("stored role corrupt: {e}")))?;

    if role.is_super() {
        return Ok(true);
    }
    if !role.is_staff() {
        return Ok(false);
    }
    let Some(category_id) = category_id else {
        return Ok(false);
    };

    let count: i64 = admin_category_assignments::table
        .filter(admin_category_assignments::admin_id.eq(target.user_id))
        .filter(admin_category_assignments::category_id.eq(category_id))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}

/// Assign a complaint to a staff member. Moves status to `assigned` in the
/// same transaction when the current status still precedes it on the track;
/// later statuses keep their status and only change `assigned_to`.
pub fn assign(
    conn: &mut PgConnection,
    staff: &AuthUser,
    scope: &Scope,
    id: Uuid,
    assignee_id: Uuid,
    note: Option<String>,
) -> AppResult<(Complaint, Option<HistoryEntry>)> {
    conn.transaction::<(Complaint, Option<HistoryEntry>), AppError, _>(|conn| {
        let complaint = load_complaint(conn, id)?;
        require_write(staff, scope, &complaint)?;

        let target: Profile = profiles::table
            .find(assignee_id)
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::AdminNotFound, "assignee not found"))?;

        if !target_has_scope(conn, &target, complaint.category_id)? {
            return Err(AppError::new(
                ErrorCode::AssigneeOutOfScope,
                format!("{} has no scope over this complaint's category", target.name),
            ));
        }

        let current = complaint
            .status
            .parse::<ComplaintStatus>()
            .map_err(|e| AppError::internal(format!("stored status corrupt: {e}")))?;

        let promote = matches!(
            (current.stage_index(), ComplaintStatus::Assigned.stage_index()),
            (Some(cur), Some(assigned)) if cur < assigned
        );

        let updated: Complaint = if promote {
            diesel::update(complaints::table.find(id))
                .set((
                    complaints::assigned_to.eq(Some(assignee_id)),
                    complaints::status.eq(ComplaintStatus::Assigned.to_string()),
                    complaints::updated_at.eq(Utc::now()),
                ))
                .get_result(conn)?
        } else {
            diesel::update(complaints::table.find(id))
                .set((
                    complaints::assigned_to.eq(Some(assignee_id)),
                    complaints::updated_at.eq(Utc::now()),
                ))
                .get_result(conn)?
        };

        let entry = if promote {
            Some(
                diesel::insert_into(complaint_history::table)
                    .values(&NewHistoryEntry {
                        complaint_id: id,
                        change_type: ChangeType::StatusChange.to_string(),
                        old_value: Some(current.to_string()),
                        new_value: Some(ComplaintStatus::Assigned.to_string()),
                        note: None,
                        changed_by: staff.id,
                    })
                    .get_result::<HistoryEntry>(conn)?,
            )
        } else {
            None
        };

        if let Some(text) = note.filter(|t| !t.trim().is_empty()) {
            diesel::insert_into(complaint_notes::table)
                .values(&NewNote {
                    complaint_id: id,
                    admin_id: staff.id,
                    note: format!("Assigned to {}. Note: {}", target.name, text.trim()),
                })
                .execute(conn)?;
        }

        Ok((updated, entry))
    })
}

/// Deadline changes are audited as free-text notes, not typed history rows
/// (preserved source behavior, see DESIGN.md).
pub fn set_deadline(
    conn: &mut PgConnection,
    staff: &AuthUser,
    scope: &Scope,
    id: Uuid,
    deadline: Option<chrono::DateTime<Utc>>,
    note: Option<String>,
) -> AppResult<(Complaint, Note)> {
    conn.transaction::<(Complaint, Note), AppError, _>(|conn| {
        let complaint = load_complaint(conn, id)?;
        require_write(staff, scope, &complaint)?;

        let updated: Complaint = diesel::update(complaints::table.find(id))
            .set((
                complaints::deadline.eq(deadline),
                complaints::deadline_note.eq(note.clone()),
                complaints::updated_at.eq(Utc::now()),
            ))
            .get_result(conn)?;

        let mut summary = match deadline {
            Some(d) => format!("Deadline set to {}", d.format("%Y-%m-%d %H:%M UTC")),
            None => "Deadline cleared".to_string(),
        };
        if let Some(text) = note.as_deref().filter(|t| !t.trim().is_empty()) {
            summary.push_str(". Note: ");
            summary.push_str(text.trim());
        }

        let audit: Note = diesel::insert_into(complaint_notes::table)
            .values(&NewNote {
                complaint_id: id,
                admin_id: staff.id,
                note: summary,
            })
            .get_result(conn)?;

        Ok((updated, audit))
    })
}

/// Delete a complaint and its entire ledger in one transaction.
pub fn delete_complaint(
    conn: &mut PgConnection,
    staff: &AuthUser,
    scope: &Scope,
    id: Uuid,
) -> AppResult<Complaint> {
    conn.transaction::<Complaint, AppError, _>(|conn| {
        let complaint = load_complaint(conn, id)?;
        require_write(staff, scope, &complaint)?;

        diesel::delete(complaint_history::table.filter(complaint_history::complaint_id.eq(id)))
            .execute(conn)?;
        diesel::delete(complaint_notes::table.filter(complaint_notes::complaint_id.eq(id)))
            .execute(conn)?;
        diesel::delete(complaint_messages::table.filter(complaint_messages::complaint_id.eq(id)))
            .execute(conn)?;
        diesel::delete(complaints::table.find(id)).execute(conn)?;

        Ok(complaint)
    })
}
