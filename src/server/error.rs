use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::error::{ImageError, StoreError, ValidationError};

/// Everything a handler can fail with. Rendered as `{"error": "..."}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Email already subscribed")]
    AlreadySubscribed,

    #[error("Image is {size} bytes, the limit is {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// The request body itself went over the body limit
    #[error("Request body too large: {0}")]
    BodyTooLarge(String),

    #[error(transparent)]
    Image(#[from] ImageError),

    /// Storage failures only expose `context` to the caller
    #[error("{context}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ApiError {
    pub fn store(context: &'static str, source: StoreError) -> Self {
        match source {
            StoreError::AlreadySubscribed => ApiError::AlreadySubscribed,
            source => ApiError::Store { context, source },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::BodyTooLarge(rejection.body_text())
        } else {
            ApiError::MalformedPayload(rejection.body_text())
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::MalformedPayload(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::MalformedPayload(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::AlreadySubscribed => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge { .. } | ApiError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Image(ImageError::TooLarge { .. } | ImageError::DimensionsTooLarge { .. }) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ApiError::Image(ImageError::Read(_) | ImageError::Task(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Image(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Store { context, source } => {
                error!("{context}: {source}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
