//! HTTP error taxonomy. Every handler failure renders as `{"error": "..."}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{error, warn};

use crate::store::StoreError;
use crate::upload::BlobError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A required request field is missing or malformed
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The server is missing something it needs, such as storage credentials
    #[error("{0}")]
    Configuration(String),

    #[error(transparent)]
    Upload(#[from] BlobError),

    /// Any other store failure; `message` is the only text the client sees
    #[error("{message}")]
    Store {
        message: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ApiError {
    /// Map a store error, keeping validation failures as 400s
    pub fn from_store(message: &'static str) -> impl FnOnce(StoreError) -> ApiError {
        move |source| match source {
            StoreError::Validation(detail) => ApiError::Validation(detail),
            source => ApiError::Store { message, source },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upload(e) => match e {
                BlobError::InvalidToken(_) | BlobError::TokenExpired => StatusCode::UNAUTHORIZED,
                BlobError::ContentTypeNotAllowed(_) | BlobError::InvalidRequest(_) => {
                    StatusCode::BAD_REQUEST
                }
                BlobError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            },
            ApiError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text placed in the error envelope
    pub fn client_message(&self) -> String {
        match self {
            ApiError::Upload(e) => match e {
                BlobError::InvalidToken(_) | BlobError::TokenExpired => {
                    "Authentication failed. Please check Blob storage token configuration."
                        .to_string()
                }
                BlobError::ContentTypeNotAllowed(_) => {
                    "Invalid file content type. Please upload a video file.".to_string()
                }
                BlobError::TooLarge { .. } => {
                    "File size exceeds the maximum allowed limit.".to_string()
                }
                BlobError::InvalidRequest(detail) => format!("Invalid upload request: {}", detail),
            },
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Store { message, source } => error!("{}: {}", message, source),
            ApiError::Configuration(detail) => error!("Configuration error: {}", detail),
            ApiError::Upload(e) => warn!("Upload rejected: {}", e),
            _ => {}
        }

        (
            status,
            Json(serde_json::json!({ "error": self.client_message() })),
        )
            .into_response()
    }
}
