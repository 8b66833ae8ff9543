use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::{credentials, refresh_tokens};

// --- Credentials ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = credentials)]
pub struct Credential {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = credentials)]
pub struct NewCredential {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

// --- Refresh tokens ---

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = refresh_tokens)]
pub struct RefreshToken {
    pub id: Uuid,
    pub credential_id: Uuid,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub device_fingerprint: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = refresh_tokens)]
pub struct NewRefreshToken {
    pub credential_id: Uuid,
    pub token_hash: String,
    pub device_fingerprint: Option<String>,
    pub expires_at: DateTime<Utc>,
}
