//! Vision configuration.

use std::path::PathBuf;

use crate::emoji::EmojiMap;
use crate::error::VisionResult;

/// Default classifier model identifier.
pub const DEFAULT_MODEL_NAME: &str = "trpakov/vit-face-expression";

/// Model locations and detection thresholds.
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Path to the face locator ONNX model
    pub face_model_path: PathBuf,
    /// Path to the expression classifier ONNX model
    pub emotion_model_path: PathBuf,
    /// Classifier identifier reported by readiness checks
    pub emotion_model_name: String,
    /// Minimum face score kept by the locator
    pub face_confidence_threshold: f32,
    /// IoU threshold for NMS
    pub face_nms_threshold: f32,
    /// Upper bound on faces returned per image
    pub max_faces: usize,
    /// Optional JSON file extending the default emoji map
    pub emoji_map_path: Option<PathBuf>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            face_model_path: PathBuf::from("models/face_detection/version-RFB-320.onnx"),
            emotion_model_path: PathBuf::from("models/emotion/vit-face-expression.onnx"),
            emotion_model_name: DEFAULT_MODEL_NAME.to_string(),
            face_confidence_threshold: 0.7,
            face_nms_threshold: 0.3,
            max_faces: 50,
            emoji_map_path: None,
        }
    }
}

impl VisionConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            face_model_path: std::env::var("FACE_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.face_model_path),
            emotion_model_path: std::env::var("EMOTION_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.emotion_model_path),
            emotion_model_name: std::env::var("EMOTION_MODEL_NAME")
                .unwrap_or(defaults.emotion_model_name),
            face_confidence_threshold: std::env::var("FACE_CONFIDENCE_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.face_confidence_threshold),
            face_nms_threshold: std::env::var("FACE_NMS_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.face_nms_threshold),
            max_faces: std::env::var("MAX_FACES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_faces),
            emoji_map_path: std::env::var("EMOJI_MAP_PATH").ok().map(PathBuf::from),
        }
    }

    /// Build the immutable emotion config (emoji table).
    pub fn emotion_config(&self) -> VisionResult<EmotionConfig> {
        let emoji_map = match &self.emoji_map_path {
            Some(path) => EmojiMap::with_overrides_from_file(path)?,
            None => EmojiMap::default(),
        };
        Ok(EmotionConfig { emoji_map })
    }
}

/// Process-wide emotion settings, built once at startup and injected into
/// the processor. The model identifier is owned by the classifier.
#[derive(Debug, Clone, Default)]
pub struct EmotionConfig {
    pub emoji_map: EmojiMap,
}
