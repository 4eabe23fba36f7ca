//! Error types for gardenhub
//!
//! Validation, not-found and authorization failures are expected control flow
//! and carry a precise reason for the caller. Store and internal failures are
//! logged at the HTTP boundary and genericized before they leave the process.

use hyper::StatusCode;
use serde::Serialize;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Main error type for gardenhub operations
#[derive(Debug, thiserror::Error)]
pub enum GardenError {
    #[error("Validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl GardenError {
    /// Shorthand for a single-field validation failure
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the detail of this error may be shown to the caller
    pub fn is_expected(&self) -> bool {
        !matches!(
            self,
            Self::Database(_) | Self::Internal(_) | Self::Config(_)
        )
    }
}

impl From<std::io::Error> for GardenError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for GardenError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("Invalid JSON: {}", err))
    }
}

impl From<mongodb::error::Error> for GardenError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for GardenError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Database(format!("BSON encode failed: {}", err))
    }
}

impl From<bson::de::Error> for GardenError {
    fn from(err: bson::de::Error) -> Self {
        Self::Database(format!("BSON decode failed: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for GardenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized(format!("JWT error: {}", err))
    }
}

/// Result type alias for gardenhub operations
pub type Result<T> = std::result::Result<T, GardenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            GardenError::invalid("name", "Name is required").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GardenError::NotFound("Garden not found".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GardenError::Forbidden("Not authorized".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            GardenError::Database("connection reset".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_errors_are_not_expected() {
        assert!(!GardenError::Database("boom".into()).is_expected());
        assert!(!GardenError::Internal("boom".into()).is_expected());
        assert!(GardenError::NotFound("x".into()).is_expected());
        assert!(GardenError::Unauthorized("x".into()).is_expected());
    }

    #[test]
    fn test_validation_message_lists_fields() {
        let err = GardenError::Validation(vec![
            FieldError::new("name", "Name is required"),
            FieldError::new("location", "Location is required"),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: name: Name is required, location: Location is required"
        );
    }
}
