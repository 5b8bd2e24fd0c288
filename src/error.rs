//! Structured error types for API responses.

use crate::graph::GraphError;
use crate::types::{TaskId, UserId};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    InvalidState,
    SelfRelationship,
    RelationshipMismatch,

    // Identity errors
    Unauthenticated,
    Forbidden,

    // Not found errors
    TaskNotFound,
    UserNotFound,
    RelationshipNotFound,

    // Conflict errors
    AlreadyExists,
    RelationshipExists,

    // Internal errors
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    /// HTTP status the code maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFieldValue
            | ErrorCode::InvalidState
            | ErrorCode::SelfRelationship
            | ErrorCode::RelationshipMismatch => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::TaskNotFound
            | ErrorCode::UserNotFound
            | ErrorCode::RelationshipNotFound => StatusCode::NOT_FOUND,
            ErrorCode::AlreadyExists | ErrorCode::RelationshipExists => StatusCode::CONFLICT,
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Structured error for API responses.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, reason)
    }

    pub fn unauthenticated() -> Self {
        Self::new(
            ErrorCode::Unauthenticated,
            "A valid X-User-Id header is required",
        )
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, reason)
    }

    pub fn task_not_found(task_id: TaskId) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
    }

    pub fn user_not_found(user_id: UserId) -> Self {
        Self::new(
            ErrorCode::UserNotFound,
            format!("User not found: {}", user_id),
        )
    }

    pub fn already_exists(field: &str, value: &str) -> Self {
        Self::new(
            ErrorCode::AlreadyExists,
            format!("{} already exists: {}", field, value),
        )
        .with_field(field)
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        let code = match &err {
            GraphError::SelfReference(_) => ErrorCode::SelfRelationship,
            GraphError::InvalidType => {
                return ApiError::invalid_value("relationship_type", &err.to_string());
            }
            GraphError::TaskNotFound(_) => ErrorCode::TaskNotFound,
            GraphError::RelationshipNotFound(_) => ErrorCode::RelationshipNotFound,
            GraphError::NotAnEndpoint { .. } => ErrorCode::RelationshipMismatch,
            GraphError::Duplicate { .. } => ErrorCode::RelationshipExists,
            GraphError::Store(_) => ErrorCode::DatabaseError,
        };
        ApiError::new(code, err.to_string())
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<ApiError>() {
            Ok(api_err) => return api_err,
            Err(err) => err,
        };
        let err = match err.downcast::<GraphError>() {
            Ok(graph_err) => return graph_err.into(),
            Err(err) => err,
        };
        match err.downcast::<rusqlite::Error>() {
            Ok(sql_err) => ApiError::database(sql_err),
            Err(err) => ApiError::internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = ?self.code, "{}", self.message);
        }
        (status, Json(self)).into_response()
    }
}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
