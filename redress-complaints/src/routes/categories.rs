use axum::extract::{Path, State};
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use redress_shared::errors::{AppError, AppResult, ErrorCode};
use redress_shared::middleware::StaffUser;
use redress_shared::types::api::ApiResponse;
use redress_shared::types::auth::AuthUser;

use crate::models::{Category, NewCategory};
use crate::schema::categories;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

/// GET /categories - visible to every authenticated user (students pick a
/// category when filing)
pub async fn list_categories(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<Category>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let items = categories::table
        .order(categories::name.asc())
        .load::<Category>(&mut conn)?;

    Ok(Json(ApiResponse::ok(items)))
}

/// POST /categories
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    StaffUser(user): StaffUser,
    Json(req): Json<CategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "category name must not be empty"));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let exists: i64 = categories::table
        .filter(categories::name.eq(&name))
        .count()
        .get_result(&mut conn)?;
    if exists > 0 {
        return Err(AppError::new(ErrorCode::CategoryNameTaken, "a category with this name already exists"));
    }

    let category: Category = diesel::insert_into(categories::table)
        .values(&NewCategory { name })
        .get_result(&mut conn)?;

    tracing::info!(category_id = %category.id, created_by = %user.id, "category created");

    Ok(Json(ApiResponse::ok(category)))
}

/// PUT /categories/:id - rename
pub async fn rename_category(
    State(state): State<Arc<AppState>>,
    StaffUser(_user): StaffUser,
    Path(category_id): Path<Uuid>,
    Json(req): Json<CategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "category name must not be empty"));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let taken: i64 = categories::table
        .filter(categories::name.eq(&name))
        .filter(categories::id.ne(category_id))
        .count()
        .get_result(&mut conn)?;
    if taken > 0 {
        return Err(AppError::new(ErrorCode::CategoryNameTaken, "a category with this name already exists"));
    }

    let category: Category = diesel::update(categories::table.find(category_id))
        .set(categories::name.eq(&name))
        .get_result(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::CategoryNotFound, "category not found"))?;

    Ok(Json(ApiResponse::ok(category)))
}

/// DELETE /categories/:id - complaints referencing it become uncategorized
/// (FK is ON DELETE SET NULL); they are never deleted with the category.
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    StaffUser(user): StaffUser,
    Path(category_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let deleted = diesel::delete(categories::table.find(category_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::new(ErrorCode::CategoryNotFound, "category not found"));
    }

    tracing::info!(category_id = %category_id, deleted_by = %user.id, "category deleted");

    Ok(Json(ApiResponse::ok(serde_json::json!({ "deleted": true }))))
}
