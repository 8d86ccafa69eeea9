//! Response envelope for the prediction endpoint.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::face_result::FaceResult;

/// Body of every `/predict-emotion/` response.
///
/// Serialized with a `status` tag:
/// - `{"status": "success", "results": [...]}`
/// - `{"status": "error", "message": "..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PredictResponse {
    Success { results: Vec<FaceResult> },
    Error { message: String },
}

impl PredictResponse {
    pub fn success(results: Vec<FaceResult>) -> Self {
        Self::Success { results }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
