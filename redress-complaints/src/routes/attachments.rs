use axum::extract::{Multipart, State};
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

use redress_shared::errors::{AppError, AppResult, ErrorCode};
use redress_shared::types::api::ApiResponse;
use redress_shared::types::auth::AuthUser;

use crate::models::AttachmentRef;
use crate::store::MAX_ATTACHMENTS;
use crate::AppState;

/// POST /attachments - upload complaint images ahead of filing.
///
/// Accepted content types: PNG and JPEG only. At most five files per
/// request, matching the per-complaint attachment limit. Returns the
/// references the client passes back into `POST /complaints`.
pub async fn upload_attachments(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<Vec<AttachmentRef>>>> {
    let mut uploaded: Vec<AttachmentRef> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::new(ErrorCode::AttachmentUploadFailed, format!("failed to read multipart: {e}")))?
    {
        if uploaded.len() >= MAX_ATTACHMENTS {
            return Err(AppError::new(
                ErrorCode::AttachmentLimitExceeded,
                format!("at most {MAX_ATTACHMENTS} attachments per complaint"),
            ));
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let ext = match content_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            _ => {
                return Err(AppError::new(
                    ErrorCode::UnsupportedAttachmentType,
                    "unsupported attachment type, accepted: png, jpeg",
                ));
            }
        };

        let file_name = field
            .file_name()
            .map(String::from)
            .unwrap_or_else(|| format!("attachment.{ext}"));

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::new(ErrorCode::AttachmentUploadFailed, format!("failed to read file data: {e}")))?;

        if data.is_empty() {
            return Err(AppError::new(ErrorCode::AttachmentUploadFailed, "empty file"));
        }

        let file_id = Uuid::now_v7();
        let key = format!("complaints/{}/{}.{}", user.id, file_id, ext);

        let url = state
            .storage
            .upload(&key, data.to_vec(), &content_type)
            .await
            .map_err(|e| AppError::new(ErrorCode::AttachmentUploadFailed, e))?;

        uploaded.push(AttachmentRef {
            url,
            name: file_name,
            content_type,
        });
    }

    if uploaded.is_empty() {
        return Err(AppError::new(ErrorCode::AttachmentUploadFailed, "no file provided"));
    }

    tracing::info!(user_id = %user.id, count = uploaded.len(), "attachments uploaded");

    Ok(Json(ApiResponse::ok(uploaded)))
}
