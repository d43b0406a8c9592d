//! HTTP error mapping.

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::DocshiftError;

use super::types::ErrorResponse;

/// An error answered with a status code and an [`ErrorResponse`] body.
///
/// Client mistakes (bad uploads, wrong types, unusable page ranges) map to 400, oversize uploads
/// to 413, and everything else to 500.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: error.into(),
                details,
            },
        }
    }

    /// 400 with the error's message as summary.
    pub fn validation(err: DocshiftError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message_of(&err), None)
    }

    /// 400 with a fixed message.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, None)
    }

    /// 413 for an upload over the per-file limit.
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message, None)
    }

    /// 500 with the error's message as summary.
    pub fn internal(err: DocshiftError) -> Self {
        tracing::error!("Request failed: {}", err);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message_of(&err), None)
    }

    /// `summary` with the error text as details. The status still follows the error kind, so a
    /// rejected input stays a 400.
    pub fn operation_failed(summary: impl Into<String>, err: DocshiftError) -> Self {
        if err.is_client_error() {
            return Self::validation(err);
        }
        let summary = summary.into();
        tracing::error!("{}: {}", summary, err);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, summary, Some(message_of(&err)))
    }
}

/// The human-readable part of an error, without the variant prefix.
fn message_of(err: &DocshiftError) -> String {
    match err {
        DocshiftError::Validation { message, .. }
        | DocshiftError::Pdf { message, .. }
        | DocshiftError::Ocr { message, .. }
        | DocshiftError::Packaging { message, .. }
        | DocshiftError::Serialization { message, .. }
        | DocshiftError::Conversion { message, .. } => message.clone(),
        DocshiftError::MissingDependency(message) | DocshiftError::Other(message) => message.clone(),
        DocshiftError::Io(_) => err.to_string(),
    }
}

impl From<DocshiftError> for ApiError {
    fn from(err: DocshiftError) -> Self {
        if err.is_client_error() {
            Self::validation(err)
        } else {
            Self::internal(err)
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        // Body-limit rejections surface here as 413
        Self::new(err.status(), err.body_text(), None)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
