use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Student,
    CategoryAdmin,
    Admin,
    SuperAdmin,
}

impl UserRole {
    /// Staff roles may triage complaints; students may only file and read
    /// their own.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::CategoryAdmin | UserRole::Admin | UserRole::SuperAdmin)
    }

    /// admin and super_admin carry the same elevated privileges (all-category
    /// scope, provisioning, role management).
    pub fn is_super(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::SuperAdmin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Student => write!(f, "student"),
            UserRole::CategoryAdmin => write!(f, "category_admin"),
            UserRole::Admin => write!(f, "admin"),
            UserRole::SuperAdmin => write!(f, "super_admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "student" => Ok(UserRole::Student),
            "category_admin" => Ok(UserRole::CategoryAdmin),
            "admin" => Ok(UserRole::Admin),
            "super_admin" => Ok(UserRole::SuperAdmin),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

impl Claims {
    pub fn new(user_id: Uuid, role: UserRole, duration_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id,
            role,
            iat: now,
            exp: now + duration_secs,
            jti: Uuid::now_v7(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: UserRole,
    pub token_id: Uuid,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
            token_id: claims.jti,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl TokenPair {
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trip() {
        for role in [UserRole::Student, UserRole::CategoryAdmin, UserRole::Admin, UserRole::SuperAdmin] {
            assert_eq!(UserRole::from_str(&role.to_string()).unwrap(), role);
        }
        assert!(UserRole::from_str("janitor").is_err());
    }

    #[test]
    fn staff_and_super_classification() {
        assert!(!UserRole::Student.is_staff());
        assert!(UserRole::CategoryAdmin.is_staff());
        assert!(!UserRole::CategoryAdmin.is_super());
        assert!(UserRole::Admin.is_super());
        assert!(UserRole::SuperAdmin.is_super());
    }

    #[test]
    fn role_serde_uses_snake_case() {
        assert_eq!(serde_json::to_string(&UserRole::CategoryAdmin).unwrap(), "\"category_admin\"");
        let parsed: UserRole = serde_json::from_str("\"super_admin\"").unwrap();
        assert_eq!(parsed, UserRole::SuperAdmin);
    }
}
