// Access policy engine.
//
// Pure predicates over (principal, scope, complaint). Every read and write
// is gated here before it reaches the store; the same rules are mirrored
// into the row-level-security policies in the migrations.

use std::collections::HashSet;

use diesel::prelude::*;
use uuid::Uuid;

use redress_shared::errors::{AppError, AppResult};
use redress_shared::types::auth::AuthUser;

use crate::models::Complaint;
use crate::schema::admin_category_assignments;

/// The set of categories a principal may act on as staff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// admin / super_admin: every category, including uncategorized.
    All,
    /// category_admin: only assigned categories. Complaints without a
    /// category are not covered (see DESIGN.md).
    Categories(HashSet<Uuid>),
    /// students hold no staff scope.
    None,
}

impl Scope {
    pub fn load(conn: &mut PgConnection, user: &AuthUser) -> AppResult<Scope> {
        if user.role.is_super() {
            return Ok(Scope::All);
        }
        if !user.role.is_staff() {
            return Ok(Scope::None);
        }

        let ids: Vec<Uuid> = admin_category_assignments::table
            .filter(admin_category_assignments::admin_id.eq(user.id))
            .select(admin_category_assignments::category_id)
            .load(conn)
            .map_err(AppError::Database)?;

        Ok(Scope::Categories(ids.into_iter().collect()))
    }

    pub fn covers(&self, category_id: Option<Uuid>) -> bool {
        match self {
            Scope::All => true,
            Scope::Categories(set) => category_id.map_or(false, |c| set.contains(&c)),
            Scope::None => false,
        }
    }
}

/// Owner may always read; staff read whatever their scope covers.
pub fn can_read(user: &AuthUser, scope: &Scope, complaint: &Complaint) -> bool {
    complaint.user_id == user.id || (user.role.is_staff() && scope.covers(complaint.category_id))
}

/// Only staff with scope write. Owners are read-only after creation.
pub fn can_write(user: &AuthUser, scope: &Scope, complaint: &Complaint) -> bool {
    user.role.is_staff() && scope.covers(complaint.category_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use redress_shared::types::auth::UserRole;

    fn user(role: UserRole) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            role,
            token_id: Uuid::new_v4(),
        }
    }

    fn complaint(owner: Uuid, category_id: Option<Uuid>) -> Complaint {
        let now = Utc::now();
        Complaint {
            id: Uuid::new_v4(),
            title: "Wifi down".into(),
            description: "No signal in block C".into(),
            priority: "medium".into(),
            status: "pending".into(),
            category_id,
            user_id: owner,
            assigned_to: None,
            attachments: serde_json::json!([]),
            deadline: None,
            deadline_note: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn owner_reads_but_never_writes() {
        let student = user(UserRole::Student);
        let c = complaint(student.id, Some(Uuid::new_v4()));
        assert!(can_read(&student, &Scope::None, &c));
        assert!(!can_write(&student, &Scope::None, &c));
    }

    #[test]
    fn strangers_are_denied() {
        let student = user(UserRole::Student);
        let c = complaint(Uuid::new_v4(), None);
        assert!(!can_read(&student, &Scope::None, &c));
        assert!(!can_write(&student, &Scope::None, &c));
    }

    #[test]
    fn super_admin_covers_everything() {
        let admin = user(UserRole::SuperAdmin);
        let categorized = complaint(Uuid::new_v4(), Some(Uuid::new_v4()));
        let uncategorized = complaint(Uuid::new_v4(), None);
        assert!(can_read(&admin, &Scope::All, &categorized));
        assert!(can_write(&admin, &Scope::All, &categorized));
        assert!(can_write(&admin, &Scope::All, &uncategorized));
    }

    #[test]
    fn category_admin_limited_to_assignment_set() {
        let network = Uuid::new_v4();
        let facilities = Uuid::new_v4();
        let admin = user(UserRole::CategoryAdmin);
        let scope = Scope::Categories([network].into_iter().collect());

        let in_scope = complaint(Uuid::new_v4(), Some(network));
        let out_of_scope = complaint(Uuid::new_v4(), Some(facilities));

        assert!(can_read(&admin, &scope, &in_scope));
        assert!(can_write(&admin, &scope, &in_scope));
        assert!(!can_read(&admin, &scope, &out_of_scope));
        assert!(!can_write(&admin, &scope, &out_of_scope));
    }

    #[test]
    fn uncategorized_invisible_to_category_admins() {
        let admin = user(UserRole::CategoryAdmin);
        let scope = Scope::Categories([Uuid::new_v4()].into_iter().collect());
        let c = complaint(Uuid::new_v4(), None);
        assert!(!can_read(&admin, &scope, &c));
        assert!(!can_write(&admin, &scope, &c));
    }

    #[test]
    fn write_implies_read() {
        let owner = Uuid::new_v4();
        let cat = Uuid::new_v4();
        let complaints = [
            complaint(owner, Some(cat)),
            complaint(owner, None),
        ];
        let scopes = [
            Scope::All,
            Scope::Categories([cat].into_iter().collect()),
            Scope::Categories(HashSet::new()),
            Scope::None,
        ];
        for role in [UserRole::Student, UserRole::CategoryAdmin, UserRole::Admin, UserRole::SuperAdmin] {
            let principal = user(role);
            for scope in &scopes {
                for c in &complaints {
                    if can_write(&principal, scope, c) {
                        assert!(can_read(&principal, scope, c), "write implies read");
                    }
                }
            }
        }
    }
}
