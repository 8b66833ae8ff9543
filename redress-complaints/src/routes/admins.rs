use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use redress_shared::errors::{AppError, AppResult, ErrorCode};
use redress_shared::middleware::SuperAdminUser;
use redress_shared::types::api::ApiResponse;
use redress_shared::types::auth::UserRole;

use crate::models::{NewAdminCategoryAssignment, NewProfile, Profile};
use crate::schema::{admin_category_assignments, categories, profiles};
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize, Validate)]
pub struct ProvisionAdminRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    pub password: String,
    pub category_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ProvisionedAdminResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CategoryAdminSummary {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub category_ids: Vec<Uuid>,
}

// Wire types for the auth service's internal API

#[derive(Debug, Serialize)]
struct InternalCreateUser<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    role: &'a str,
}

#[derive(Debug, Deserialize)]
struct InternalUserEnvelope {
    data: InternalUser,
}

#[derive(Debug, Deserialize)]
struct InternalUser {
    id: Uuid,
    email: String,
    name: String,
}

// --- Provisioning side-channel ---

/// POST /admin/category-admins
///
/// Creates the identity in the auth service, then inserts the category
/// assignments locally. A failure after identity creation rolls the
/// identity back via the auth internal delete, so a failed call leaves no
/// partial state behind.
pub async fn provision_category_admin(
    State(state): State<Arc<AppState>>,
    SuperAdminUser(caller): SuperAdminUser,
    Json(req): Json<ProvisionAdminRequest>,
) -> AppResult<Json<ApiResponse<ProvisionedAdminResponse>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    if req.password.len() < 6 {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must be at least 6 characters"));
    }
    if req.category_ids.is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "at least one category is required"));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let known: i64 = categories::table
        .filter(categories::id.eq_any(&req.category_ids))
        .count()
        .get_result(&mut conn)?;
    if known != req.category_ids.len() as i64 {
        return Err(AppError::new(ErrorCode::CategoryNotFound, "one or more categories do not exist"));
    }

    // Step 1: create the identity (auth service owns credentials).
    let url = format!("{}/internal/users", state.config.auth_internal_url);
    let role = UserRole::CategoryAdmin.to_string();
    let response = state
        .http
        .post(&url)
        .json(&InternalCreateUser {
            name: &req.name,
            email: &req.email,
            password: &req.password,
            role: &role,
        })
        .send()
        .await
        .map_err(|e| AppError::new(ErrorCode::ProvisioningFailure, format!("auth service unreachable: {e}")))?;

    if response.status() == reqwest::StatusCode::CONFLICT {
        return Err(AppError::new(ErrorCode::EmailAlreadyExists, "email already registered"));
    }
    if !response.status().is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(AppError::new(
            ErrorCode::ProvisioningFailure,
            format!("identity creation failed: {detail}"),
        ));
    }

    let created: InternalUserEnvelope = response
        .json()
        .await
        .map_err(|e| AppError::new(ErrorCode::ProvisioningFailure, format!("bad auth response: {e}")))?;
    let admin = created.data;

    // Step 2: assignments + profile mirror, atomically. The subscriber will
    // re-upsert the profile when the registered event arrives; doing it here
    // keeps the caller read-after-write consistent.
    let assignment_result = conn.transaction::<(), diesel::result::Error, _>(|conn| {
        diesel::insert_into(profiles::table)
            .values(&NewProfile {
                user_id: admin.id,
                name: admin.name.clone(),
                email: admin.email.clone(),
                role: UserRole::CategoryAdmin.to_string(),
            })
            .on_conflict(profiles::user_id)
            .do_nothing()
            .execute(conn)?;

        let rows: Vec<NewAdminCategoryAssignment> = req
            .category_ids
            .iter()
            .map(|&category_id| NewAdminCategoryAssignment {
                admin_id: admin.id,
                category_id,
                assigned_by: caller.id,
            })
            .collect();

        diesel::insert_into(admin_category_assignments::table)
            .values(&rows)
            .execute(conn)?;

        Ok(())
    });

    if let Err(e) = assignment_result {
        tracing::error!(error = %e, admin_id = %admin.id, "category assignment failed, rolling back identity");

        // Compensating action: remove the identity we just created.
        let delete_url = format!("{}/internal/users/{}", state.config.auth_internal_url, admin.id);
        if let Err(re) = state.http.delete(&delete_url).send().await {
            tracing::error!(error = %re, admin_id = %admin.id, "identity rollback failed; orphaned account");
        }

        return Err(AppError::new(
            ErrorCode::ProvisioningFailure,
            "failed to assign categories; the new account was rolled back",
        ));
    }

    tracing::info!(
        admin_id = %admin.id,
        categories = req.category_ids.len(),
        provisioned_by = %caller.id,
        "category admin provisioned"
    );

    Ok(Json(ApiResponse::ok(ProvisionedAdminResponse {
        id: admin.id,
        email: admin.email,
        name: admin.name,
    })))
}

/// GET /admin/category-admins - every category admin with their scope
pub async fn list_category_admins(
    State(state): State<Arc<AppState>>,
    SuperAdminUser(_caller): SuperAdminUser,
) -> AppResult<Json<ApiResponse<Vec<CategoryAdminSummary>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let admins: Vec<Profile> = profiles::table
        .filter(profiles::role.eq(UserRole::CategoryAdmin.to_string()))
        .order(profiles::name.asc())
        .load(&mut conn)?;

    let admin_ids: Vec<Uuid> = admins.iter().map(|p| p.user_id).collect();
    let assignments: Vec<(Uuid, Uuid)> = admin_category_assignments::table
        .filter(admin_category_assignments::admin_id.eq_any(&admin_ids))
        .select((
            admin_category_assignments::admin_id,
            admin_category_assignments::category_id,
        ))
        .load(&mut conn)?;

    let mut by_admin: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (admin_id, category_id) in assignments {
        by_admin.entry(admin_id).or_default().push(category_id);
    }

    let summaries = admins
        .into_iter()
        .map(|p| CategoryAdminSummary {
            category_ids: by_admin.remove(&p.user_id).unwrap_or_default(),
            user_id: p.user_id,
            name: p.name,
            email: p.email,
        })
        .collect();

    Ok(Json(ApiResponse::ok(summaries)))
}
