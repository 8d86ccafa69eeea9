//! Per-face result reported to clients.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::bounding_box::PixelBox;
use crate::emotion::Classification;

/// Label used for faces that could not be classified.
pub const ERROR_LABEL: &str = "Error";

/// One detected face and its classified emotion.
///
/// Every field is always serialized; absent values are written as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FaceResult {
    /// 1-based position in the face locator's output
    pub face_index: usize,
    /// Truncated pixel box, `[0, 0, 0, 0]` on error
    #[serde(rename = "box")]
    pub bbox: PixelBox,
    pub emotion_label: String,
    pub emotion_id: Option<u32>,
    /// Confidence as a percentage (0-100), two decimals
    pub confidence: f64,
    pub emoji: String,
    pub error: Option<String>,
}

impl FaceResult {
    /// Build a result for a successfully classified face.
    pub fn success(
        face_index: usize,
        bbox: PixelBox,
        classification: &Classification,
        emoji: impl Into<String>,
    ) -> Self {
        Self {
            face_index,
            bbox,
            emotion_label: classification.emotion_label.clone(),
            emotion_id: Some(classification.emotion_id),
            confidence: to_percentage(classification.confidence),
            emoji: emoji.into(),
            error: None,
        }
    }

    /// Build the placeholder for a face whose crop or classification failed.
    ///
    /// The box is always `[0, 0, 0, 0]`, not the attempted coordinates.
    pub fn failed(face_index: usize, error: impl Into<String>) -> Self {
        Self {
            face_index,
            bbox: [0, 0, 0, 0],
            emotion_label: ERROR_LABEL.to_string(),
            emotion_id: None,
            confidence: 0.0,
            emoji: String::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Scale a [0, 1] probability to a percentage rounded to two decimals.
pub fn to_percentage(confidence: f32) -> f64 {
    let clamped = f64::from(confidence).clamp(0.0, 1.0);
    (clamped * 100.0 * 100.0).round() / 100.0
}
