use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

/// A single failed form rule, keyed by the field it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self { field: field.to_string(), message: message.to_string() }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("{0} is not loaded yet")]
    NotLoaded(String),

    #[error("Local storage error: {0}")]
    Storage(String),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ApiError {
    /// Map a non-success response to the matching variant.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let msg = if body.is_empty() { status.to_string() } else { body };
                ApiError::Unauthorized(msg)
            }
            StatusCode::NOT_FOUND => ApiError::NotFound(body),
            _ => ApiError::Status { status: status.as_u16(), body },
        }
    }

    pub fn invalid(field: &str, message: &str) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ApiError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::from_status(status, e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        ApiError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_statuses_map_to_unauthorized() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, String::new());
        assert!(matches!(err, ApiError::Unauthorized(_)));
        let err = ApiError::from_status(StatusCode::FORBIDDEN, "token expired".into());
        assert_eq!(err.to_string(), "Unauthorized: token expired");
    }

    #[test]
    fn other_statuses_keep_code_and_body() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream".into());
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "upstream");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn validation_message_lists_fields() {
        let err = ApiError::Validation(vec![
            FieldError::new("email", "is required"),
            FieldError::new("password", "too short"),
        ]);
        assert_eq!(err.to_string(), "Validation failed: email: is required, password: too short");
        assert_eq!(err.field_errors().len(), 2);
    }
}
