use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{service}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth errors
/// - E2xxx: Complaint errors
/// - E3xxx: Ledger/messaging errors
/// - E4xxx: Provisioning errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    BadRequest,
    ServiceUnavailable,
    PayloadTooLarge,

    // Auth (E1xxx)
    InvalidCredentials,
    EmailAlreadyExists,
    TokenExpired,
    TokenInvalid,
    RefreshTokenRevoked,
    PasswordTooWeak,
    UnknownRole,

    // Complaints (E2xxx)
    ComplaintNotFound,
    InvalidTransition,
    CategoryNotFound,
    CategoryNameTaken,
    AttachmentLimitExceeded,
    UnsupportedAttachmentType,
    AttachmentUploadFailed,
    AssigneeOutOfScope,

    // Ledger/messaging (E3xxx)
    NoteNotFound,
    NotNoteAuthor,

    // Provisioning (E4xxx)
    ProvisioningFailure,
    AdminNotFound,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::BadRequest => "E0006",
            Self::ServiceUnavailable => "E0007",
            Self::PayloadTooLarge => "E0008",

            // Auth
            Self::InvalidCredentials => "E1001",
            Self::EmailAlreadyExists => "E1002",
            Self::TokenExpired => "E1003",
            Self::TokenInvalid => "E1004",
            Self::RefreshTokenRevoked => "E1005",
            Self::PasswordTooWeak => "E1006",
            Self::UnknownRole => "E1007",

            // Complaints
            Self::ComplaintNotFound => "E2001",
            Self::InvalidTransition => "E2002",
            Self::CategoryNotFound => "E2003",
            Self::CategoryNameTaken => "E2004",
            Self::AttachmentLimitExceeded => "E2005",
            Self::UnsupportedAttachmentType => "E2006",
            Self::AttachmentUploadFailed => "E2007",
            Self::AssigneeOutOfScope => "E2008",

            // Ledger/messaging
            Self::NoteNotFound => "E3001",
            Self::NotNoteAuthor => "E3002",

            // Provisioning
            Self::ProvisioningFailure => "E4001",
            Self::AdminNotFound => "E4002",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::ServiceUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::PasswordTooWeak
            | Self::UnknownRole | Self::AttachmentLimitExceeded
            | Self::UnsupportedAttachmentType | Self::AttachmentUploadFailed
            | Self::AssigneeOutOfScope => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound | Self::ComplaintNotFound | Self::CategoryNotFound
            | Self::NoteNotFound | Self::AdminNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::InvalidCredentials | Self::TokenExpired
            | Self::TokenInvalid | Self::RefreshTokenRevoked => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::NotNoteAuthor => StatusCode::FORBIDDEN,
            Self::EmailAlreadyExists | Self::CategoryNameTaken
            | Self::InvalidTransition => StatusCode::CONFLICT,
            Self::ProvisioningFailure => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
