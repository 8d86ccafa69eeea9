//! API error types.
//!
//! Request-level failures fall in two categories:
//! - known: a typed failure with a fixed, caller-safe message
//! - unknown: anything else, reported as "Internal server error"
//!
//! The full cause is logged once when the error is turned into a response;
//! the caller only ever sees the display string.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use metrics::counter;
use thiserror::Error;
use tracing::error;

use emodet_models::PredictResponse;
use emodet_vision::VisionError;

use crate::metrics::names;

pub type ApiResult<T> = Result<T, ApiError>;

/// Message returned for unknown failures.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Uploaded file is not a supported image")]
    InvalidImage(#[source] VisionError),

    #[error("Emotion processing failed")]
    Processing(#[source] VisionError),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn invalid_upload(msg: impl Into<String>) -> Self {
        Self::InvalidUpload(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short category name for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidUpload(_) => "invalid_upload",
            ApiError::InvalidImage(_) => "invalid_image",
            ApiError::Processing(_) => "processing",
            ApiError::Internal(_) => "internal",
        }
    }

    /// Known failures carry a typed cause; unknown ones don't.
    pub fn is_known(&self) -> bool {
        !matches!(self, ApiError::Internal(_))
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Message safe to return to the caller.
    pub fn public_message(&self) -> String {
        if self.is_known() {
            self.to_string()
        } else {
            INTERNAL_ERROR_MESSAGE.to_string()
        }
    }
}

impl From<VisionError> for ApiError {
    fn from(err: VisionError) -> Self {
        if err.is_bad_input() {
            ApiError::InvalidImage(err)
        } else {
            ApiError::Processing(err)
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::InvalidUpload(err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ApiError::InvalidImage(cause) | ApiError::Processing(cause) => {
                error!(kind = self.kind(), cause = %cause, "Request failed: {}", self);
            }
            ApiError::InvalidUpload(_) => {
                error!(kind = self.kind(), "Request failed: {}", self);
            }
            ApiError::Internal(detail) => {
                error!(kind = self.kind(), detail = %detail, "Unhandled error");
            }
        }
        counter!(names::PREDICTIONS_FAILED_TOTAL, "kind" => self.kind()).increment(1);

        let body = PredictResponse::error(self.public_message());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vision_error_mapping() {
        let decode = VisionError::ImageDecode(image_error());
        assert!(matches!(ApiError::from(decode), ApiError::InvalidImage(_)));

        let detect = VisionError::detection_failed("session lost");
        assert!(matches!(ApiError::from(detect), ApiError::Processing(_)));
    }

    #[test]
    fn test_known_message_hides_cause() {
        let err = ApiError::from(VisionError::detection_failed("tensor shape [1, 2]"));
        assert!(err.is_known());
        assert_eq!(err.public_message(), "Emotion processing failed");
    }

    #[test]
    fn test_unknown_message_is_generic() {
        let err = ApiError::internal("worker panicked at src/processor.rs:42");
        assert!(!err.is_known());
        assert_eq!(err.public_message(), INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn test_all_errors_are_500() {
        let response = ApiError::invalid_upload("missing 'file' field").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    fn image_error() -> image::ImageError {
        image::ImageError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, "bad"))
    }
}
