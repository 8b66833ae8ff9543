use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ Event envelope wrapping all domain events.
///
/// Routing key format: `redress.{domain}.{entity}.{action}`
/// Example: `redress.complaints.complaint.updated`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    // Auth events
    pub const AUTH_USER_REGISTERED: &str = "redress.auth.user.registered";
    pub const AUTH_ROLE_CHANGED: &str = "redress.auth.user.role_changed";

    // Complaint change feed. Subscribers treat these as refetch triggers,
    // never as authoritative state.
    pub const COMPLAINT_CREATED: &str = "redress.complaints.complaint.created";
    pub const COMPLAINT_UPDATED: &str = "redress.complaints.complaint.updated";
    pub const COMPLAINT_DELETED: &str = "redress.complaints.complaint.deleted";
    pub const NOTE_ADDED: &str = "redress.complaints.note.added";
    pub const NOTE_DELETED: &str = "redress.complaints.note.deleted";
    pub const MESSAGE_SENT: &str = "redress.complaints.message.sent";

    /// Binding pattern covering the whole complaint change feed.
    pub const COMPLAINTS_ALL: &str = "redress.complaints.#";
}

/// Common event data payloads
pub mod payloads {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    use crate::types::auth::UserRole;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct UserRegistered {
        pub user_id: Uuid,
        pub name: String,
        pub email: String,
        pub role: UserRole,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct RoleChanged {
        pub user_id: Uuid,
        pub role: UserRole,
    }

    /// A row belonging to a complaint changed. `table` names the touched
    /// table (`complaints`, `complaint_history`, `complaint_notes`,
    /// `complaint_messages`) and `action` the kind of write (`insert`,
    /// `update`, `delete`). `owner_id` and `category_id` exist so the
    /// notifier can fan out by subscription scope without a database.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ComplaintTouched {
        pub complaint_id: Uuid,
        pub owner_id: Uuid,
        pub category_id: Option<Uuid>,
        pub table: String,
        pub action: String,
    }
}
