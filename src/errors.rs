use crate::models::IdentityError;
use crate::validation::{FieldError, ValidationErrors};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

// --- Store-facing errors ---

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Meme not found with ID: {0}")]
    NotFound(Uuid),

    #[error("Meme {0} is owned by another identity")]
    NotOwner(Uuid),

    #[error("Database backend error: {0}")]
    BackendError(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("File upload failed: {0}")]
    UploadFailed(String),

    #[error("Storage backend error: {0}")]
    BackendError(#[from] anyhow::Error),
}

// --- Component-facing errors ---

/// Stable tag for a `MemeError`, safe to hand to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    AuthRequired,
    NotOwner,
    SubmissionInProgress,
    Upload,
    Insert,
    Delete,
    Fetch,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::AuthRequired => "auth_required",
            ErrorKind::NotOwner => "not_owner",
            ErrorKind::SubmissionInProgress => "submission_in_progress",
            ErrorKind::Upload => "upload",
            ErrorKind::Insert => "insert",
            ErrorKind::Delete => "delete",
            ErrorKind::Fetch => "fetch",
        }
    }
}

/// Outcome of a failed `submit`, `refresh` or `delete`.
#[derive(Error, Debug)]
pub enum MemeError {
    #[error("Invalid meme: {0}")]
    Validation(ValidationErrors),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Meme {0} is owned by another identity")]
    NotOwner(Uuid),

    #[error("A submission is already in progress")]
    SubmissionInProgress,

    #[error("Image upload failed")]
    Upload(#[source] StorageError),

    /// The image, if any, was already uploaded and stays in the object store.
    #[error("Could not save meme record")]
    Insert(#[source] RepoError),

    #[error("Could not delete meme")]
    Delete(#[source] RepoError),

    #[error("Could not load memes")]
    Fetch(#[source] RepoError),
}

impl MemeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MemeError::Validation(_) => ErrorKind::Validation,
            MemeError::AuthRequired => ErrorKind::AuthRequired,
            MemeError::NotOwner(_) => ErrorKind::NotOwner,
            MemeError::SubmissionInProgress => ErrorKind::SubmissionInProgress,
            MemeError::Upload(_) => ErrorKind::Upload,
            MemeError::Insert(_) => ErrorKind::Insert,
            MemeError::Delete(_) => ErrorKind::Delete,
            MemeError::Fetch(_) => ErrorKind::Fetch,
        }
    }

    /// Local errors are decided before any store call and are never logged as failures.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            MemeError::Validation(_)
                | MemeError::AuthRequired
                | MemeError::NotOwner(_)
                | MemeError::SubmissionInProgress
        )
    }

    /// Text shown to the user. Remote failures get a generic message.
    pub fn user_message(&self) -> String {
        match self {
            MemeError::Validation(errors) => errors.to_string(),
            MemeError::AuthRequired => "Please log in to continue".to_string(),
            MemeError::NotOwner(_) => "You can only delete your own memes".to_string(),
            MemeError::SubmissionInProgress => "Your meme is still being created".to_string(),
            MemeError::Upload(_) | MemeError::Insert(_) => {
                "There was an error creating your meme. Please try again.".to_string()
            }
            MemeError::Delete(_) => "There was an error deleting the meme. Please try again.".to_string(),
            MemeError::Fetch(_) => "There was an error loading memes. Please try again.".to_string(),
        }
    }
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Meme(#[from] MemeError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Error processing multipart form data: {0}")]
    MultipartError(#[from] axum::extract::multipart::MultipartError),
    #[error("Invalid meme ID format: {0}")]
    InvalidUuid(#[from] uuid::Error),
    #[error("Invalid identity: {0}")]
    InvalidIdentity(#[from] IdentityError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Initialization error: {0}")]
    InitError(String),
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    kind: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a [FieldError]>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Meme(err) => {
                let status = match err {
                    MemeError::Validation(_) => StatusCode::BAD_REQUEST,
                    MemeError::AuthRequired => StatusCode::UNAUTHORIZED,
                    MemeError::NotOwner(_) => StatusCode::FORBIDDEN,
                    MemeError::SubmissionInProgress => StatusCode::CONFLICT,
                    MemeError::Upload(_)
                    | MemeError::Insert(_)
                    | MemeError::Delete(_)
                    | MemeError::Fetch(_) => StatusCode::BAD_GATEWAY,
                };
                let fields = match err {
                    MemeError::Validation(errors) => Some(errors.fields.as_slice()),
                    _ => None,
                };
                (
                    status,
                    ErrorBody {
                        kind: err.kind().as_str(),
                        message: err.user_message(),
                        fields,
                    },
                )
            }

            // 4xx Client Errors
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, plain_body("invalid_input", msg.clone())),
            AppError::MultipartError(e) => (
                StatusCode::BAD_REQUEST,
                plain_body("invalid_input", format!("Invalid multipart form data: {}", e)),
            ),
            AppError::InvalidUuid(e) => (
                StatusCode::BAD_REQUEST,
                plain_body("invalid_input", format!("Invalid ID format: {}", e)),
            ),
            AppError::InvalidIdentity(e) => (StatusCode::UNAUTHORIZED, plain_body("auth_required", e.to_string())),

            // 5xx Server Errors
            AppError::ConfigError(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, plain_body("internal", "Server configuration error".to_string()))
            }
            AppError::InitError(msg) => {
                tracing::error!("Initialization error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, plain_body("internal", "Server initialization error".to_string()))
            }
        };

        if status.is_server_error() {
            tracing::error!(error.message = %body.message, error.detail = %self, "Responding with error");
        } else {
            tracing::debug!(error.message = %body.message, status = %status, "Rejecting request");
        }

        (status, Json(serde_json::json!({ "error": body }))).into_response()
    }
}

fn plain_body(kind: &'static str, message: String) -> ErrorBody<'static> {
    ErrorBody {
        kind,
        message,
        fields: None,
    }
}
