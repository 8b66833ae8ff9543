use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{
    admin_category_assignments, categories, complaint_history, complaint_messages,
    complaint_notes, complaints, profiles,
};

// --- Category ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = categories)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = categories)]
pub struct NewCategory {
    pub name: String,
}

// --- Complaint ---

/// One attachment reference as stored inside the complaint's JSONB
/// `attachments` column. Rows never leave the store as raw JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttachmentRef {
    pub url: String,
    pub name: String,
    pub content_type: String,
}

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = complaints)]
pub struct Complaint {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: String,
    pub status: String,
    pub category_id: Option<Uuid>,
    pub user_id: Uuid,
    pub assigned_to: Option<Uuid>,
    pub attachments: serde_json::Value,
    pub deadline: Option<DateTime<Utc>>,
    pub deadline_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Complaint {
    pub fn attachment_refs(&self) -> Vec<AttachmentRef> {
        serde_json::from_value(self.attachments.clone()).unwrap_or_default()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = complaints)]
pub struct NewComplaint {
    pub title: String,
    pub description: String,
    pub priority: String,
    pub status: String,
    pub category_id: Option<Uuid>,
    pub user_id: Uuid,
    pub attachments: serde_json::Value,
}

// --- History (system log, append-only) ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = complaint_history)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub change_type: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub note: Option<String>,
    pub changed_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = complaint_history)]
pub struct NewHistoryEntry {
    pub complaint_id: Uuid,
    pub change_type: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub note: Option<String>,
    pub changed_by: Uuid,
}

// --- Note (admin annotation) ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = complaint_notes)]
pub struct Note {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub admin_id: Uuid,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = complaint_notes)]
pub struct NewNote {
    pub complaint_id: Uuid,
    pub admin_id: Uuid,
    pub note: String,
}

// --- Message (owner <-> staff conversation, append-only) ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = complaint_messages)]
pub struct Message {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub sender_id: Uuid,
    pub is_admin: bool,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = complaint_messages)]
pub struct NewMessage {
    pub complaint_id: Uuid,
    pub sender_id: Uuid,
    pub is_admin: bool,
    pub message: String,
}

// --- Admin category assignment ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = admin_category_assignments)]
pub struct AdminCategoryAssignment {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub category_id: Uuid,
    pub assigned_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = admin_category_assignments)]
pub struct NewAdminCategoryAssignment {
    pub admin_id: Uuid,
    pub category_id: Uuid,
    pub assigned_by: Uuid,
}

// --- Profile mirror (maintained from auth events) ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = profiles)]
#[diesel(primary_key(user_id))]
pub struct Profile {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
}
