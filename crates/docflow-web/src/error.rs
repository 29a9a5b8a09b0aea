//! HTTP error mapping (§7): a single enum that every route maps its
//! failures onto, following the teacher's `(StatusCode, Json<ErrorResponse>)`
//! pattern from `stewardship_routes.rs`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use docflow_core::DocflowError;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    MissingFile(String),

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream object storage failed: {0}")]
    BadGateway(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DocflowError> for ApiError {
    fn from(err: DocflowError) -> Self {
        match err {
            DocflowError::Validation(msg) => ApiError::MissingFile(msg),
            DocflowError::NotFound(msg) => ApiError::NotFound(msg),
            DocflowError::Ownership(msg) => ApiError::NotFound(msg),
            DocflowError::UpstreamStorage(msg) => ApiError::BadGateway(msg),
            DocflowError::Persistence(msg) | DocflowError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<docflow_store::StoreError> for ApiError {
    fn from(err: docflow_store::StoreError) -> Self {
        ApiError::from(DocflowError::from(err))
    }
}

impl From<crate::object_store::ObjectStoreError> for ApiError {
    fn from(err: crate::object_store::ObjectStoreError) -> Self {
        ApiError::BadGateway(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    #[serde(rename = "statusCode")]
    status_code: u16,
    message: String,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, label) = match &self {
            ApiError::MissingFile(_) => (StatusCode::BAD_REQUEST, "Bad Request"),
            ApiError::UnsupportedMediaType(_) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported Media Type"),
            ApiError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found"),
            ApiError::BadGateway(_) => (StatusCode::BAD_GATEWAY, "Bad Gateway"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
        };
        let body = ErrorBody {
            status_code: status.as_u16(),
            message: self.to_string(),
            error: label.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
