/// Error types shared across the crate
///
/// Each concern gets its own enum so callers can match on what actually
/// went wrong: the image pipeline, the catalog, payload validation, and
/// configuration.

use axum::http::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Failures in the image acquisition and cropping pipeline
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to read image file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Image is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("Image is {width}x{height}, the limit is {limit}px per side")]
    DimensionsTooLarge { width: u32, height: u32, limit: u32 },

    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(&'static str),

    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Crop {x},{y} {width}x{height} lies outside the {image_width}x{image_height} image")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },

    #[error("Aspect ratio must be a positive finite number, got {0}")]
    InvalidAspect(f64),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Failures in the SQLite catalog
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to create data directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Email already subscribed")]
    AlreadySubscribed,
}

/// Payload fields that failed validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{0} must be an image data URL")]
    NotAnImage(&'static str),
}

/// Environment values that could not be parsed
#[derive(Error, Debug)]
#[error("Invalid value for {key}: {message}")]
pub struct ConfigError {
    pub key: &'static str,
    pub message: String,
}

/// Why a create or delete request to the API did not succeed.
///
/// Only the duplicate newsletter email is told apart from everything else.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Email already subscribed")]
    Duplicate,

    #[error("{0}")]
    Failed(String),
}

impl SubmitError {
    /// Classify a non-success API reply. `409 Conflict` is the duplicate
    /// email; anything else carries the reply's `error` text.
    pub fn from_response(status: StatusCode, body: &Value) -> Self {
        if status == StatusCode::CONFLICT {
            return SubmitError::Duplicate;
        }

        let message = body["error"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());
        SubmitError::Failed(message)
    }

    /// Turn an API reply into the result fed back to the form session
    pub fn check(status: StatusCode, body: &Value) -> Result<(), Self> {
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::from_response(status, body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conflict_is_a_duplicate() {
        let body = json!({ "error": "Email already subscribed" });
        assert_eq!(SubmitError::from_response(StatusCode::CONFLICT, &body), SubmitError::Duplicate);
    }

    #[test]
    fn test_other_failures_keep_the_error_text() {
        let body = json!({ "error": "email is required" });
        assert_eq!(
            SubmitError::from_response(StatusCode::BAD_REQUEST, &body),
            SubmitError::Failed("email is required".into())
        );

        assert_eq!(
            SubmitError::from_response(StatusCode::BAD_GATEWAY, &Value::Null),
            SubmitError::Failed("Bad Gateway".into())
        );
    }

    #[test]
    fn test_success_statuses_pass() {
        assert_eq!(SubmitError::check(StatusCode::CREATED, &json!({ "_id": 1 })), Ok(()));
        assert_eq!(SubmitError::check(StatusCode::OK, &Value::Null), Ok(()));
    }
}
