//! Face location using the UltraFace (RFB-320) ONNX model.
//!
//! The model takes a 320x240 RGB image normalized to `(p - 127) / 128` and
//! emits two outputs for a fixed set of prior boxes:
//! - `scores`: `[1, N, 2]` background / face probabilities
//! - `boxes`: `[1, N, 4]` corner coordinates normalized to [0, 1]

use std::path::PathBuf;
use std::sync::Mutex;

use image::DynamicImage;
use image::GenericImageView;
use ndarray::Array2;
use ort::session::Session;
use ort::value::Value;
use tracing::{debug, info};

use emodet_models::BoundingBox;

use crate::capability::FaceLocator;
use crate::config::VisionConfig;
use crate::error::{VisionError, VisionResult};
use crate::onnx::{chw_tensor, create_session, rgb_to_chw, Normalization};

const INPUT_WIDTH: u32 = 320;
const INPUT_HEIGHT: u32 = 240;

const NORMALIZATION: Normalization = Normalization {
    scale: 1.0,
    mean: 127.0,
    std: 128.0,
};

/// Configuration for the face locator.
#[derive(Debug, Clone)]
pub struct FaceLocatorConfig {
    /// Path to ONNX model file
    pub model_path: PathBuf,
    /// Minimum face probability
    pub confidence_threshold: f32,
    /// IoU threshold for NMS
    pub nms_threshold: f32,
    /// Maximum number of faces returned
    pub max_faces: usize,
}

impl Default for FaceLocatorConfig {
    fn default() -> Self {
        let vision = VisionConfig::default();
        Self::from(&vision)
    }
}

impl From<&VisionConfig> for FaceLocatorConfig {
    fn from(config: &VisionConfig) -> Self {
        Self {
            model_path: config.face_model_path.clone(),
            confidence_threshold: config.face_confidence_threshold,
            nms_threshold: config.face_nms_threshold,
            max_faces: config.max_faces,
        }
    }
}

/// A candidate face before NMS.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    bbox: BoundingBox,
    score: f32,
}

/// UltraFace-backed face locator.
pub struct OnnxFaceLocator {
    session: Mutex<Session>,
    config: FaceLocatorConfig,
}

impl OnnxFaceLocator {
    /// Load the locator model.
    ///
    /// Returns error if model file doesn't exist or cannot be loaded.
    pub fn new(config: FaceLocatorConfig) -> VisionResult<Self> {
        let session = Mutex::new(create_session(&config.model_path, "face_locator")?);
        info!(
            model_path = %config.model_path.display(),
            confidence_threshold = config.confidence_threshold,
            "Face locator initialized"
        );
        Ok(Self { session, config })
    }

    fn preprocess(&self, image: &DynamicImage) -> VisionResult<Value> {
        let resized = image
            .resize_exact(INPUT_WIDTH, INPUT_HEIGHT, image::imageops::FilterType::Triangle)
            .to_rgb8();
        chw_tensor(rgb_to_chw(&resized, NORMALIZATION), INPUT_WIDTH, INPUT_HEIGHT)
    }

    /// Run inference, returning flattened `(scores, boxes)`.
    fn run_inference(&self, input: Value) -> VisionResult<(Vec<f32>, Vec<f32>)> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| VisionError::detection_failed("Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| VisionError::detection_failed(format!("ONNX inference failed: {}", e)))?;

        let scores = outputs
            .get("scores")
            .ok_or_else(|| VisionError::detection_failed("Missing scores tensor"))?
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::detection_failed(format!("Failed to extract scores: {}", e)))?
            .1
            .to_vec();

        let boxes = outputs
            .get("boxes")
            .ok_or_else(|| VisionError::detection_failed("Missing boxes tensor"))?
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::detection_failed(format!("Failed to extract boxes: {}", e)))?
            .1
            .to_vec();

        Ok((scores, boxes))
    }
}

impl FaceLocator for OnnxFaceLocator {
    fn detect(&self, image: &DynamicImage) -> VisionResult<Vec<BoundingBox>> {
        let (width, height) = image.dimensions();
        let input = self.preprocess(image)?;
        let (scores, boxes) = self.run_inference(input)?;
        let faces = decode_faces(&scores, &boxes, width, height, &self.config)?;

        debug!(count = faces.len(), width, height, "Face location completed");
        Ok(faces)
    }

    fn name(&self) -> &'static str {
        "ultraface"
    }
}

/// Turn raw model outputs into pixel-space boxes, best first.
fn decode_faces(
    scores: &[f32],
    boxes: &[f32],
    width: u32,
    height: u32,
    config: &FaceLocatorConfig,
) -> VisionResult<Vec<BoundingBox>> {
    if scores.len() % 2 != 0 || boxes.len() % 4 != 0 || scores.len() / 2 != boxes.len() / 4 {
        return Err(VisionError::detection_failed(format!(
            "Unexpected output sizes: scores={}, boxes={}",
            scores.len(),
            boxes.len()
        )));
    }
    let priors = scores.len() / 2;

    let scores = Array2::from_shape_vec((priors, 2), scores.to_vec())
        .map_err(|e| VisionError::detection_failed(format!("Failed to reshape scores: {}", e)))?;
    let boxes = Array2::from_shape_vec((priors, 4), boxes.to_vec())
        .map_err(|e| VisionError::detection_failed(format!("Failed to reshape boxes: {}", e)))?;

    let (w, h) = (width as f32, height as f32);
    let candidates: Vec<Candidate> = (0..priors)
        .filter(|&i| scores[[i, 1]] > config.confidence_threshold)
        .map(|i| Candidate {
            bbox: BoundingBox::new(
                boxes[[i, 0]] * w,
                boxes[[i, 1]] * h,
                boxes[[i, 2]] * w,
                boxes[[i, 3]] * h,
            ),
            score: scores[[i, 1]],
        })
        .collect();

    let mut kept = non_maximum_suppression(candidates, config.nms_threshold);
    kept.truncate(config.max_faces);

    Ok(kept.into_iter().map(|c| c.bbox).collect())
}

/// Greedy NMS; output is sorted by descending score.
fn non_maximum_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if keep
            .iter()
            .all(|kept| kept.bbox.iou(&candidate.bbox) <= iou_threshold)
        {
            keep.push(candidate);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FaceLocatorConfig {
        FaceLocatorConfig {
            model_path: PathBuf::from("unused.onnx"),
            confidence_threshold: 0.7,
            nms_threshold: 0.3,
            max_faces: 10,
        }
    }

    #[test]
    fn test_config_default() {
        let config = FaceLocatorConfig::default();
        assert!((config.confidence_threshold - 0.7).abs() < 0.001);
        assert!((config.nms_threshold - 0.3).abs() < 0.001);
        assert_eq!(config.max_faces, 50);
    }

    #[test]
    fn test_decode_filters_and_scales() {
        // Three priors: confident face, background, overlapping weaker face
        let scores = [0.05, 0.95, 0.9, 0.1, 0.2, 0.8];
        let boxes = [
            0.1, 0.1, 0.3, 0.5, //
            0.5, 0.5, 0.6, 0.6, //
            0.11, 0.1, 0.31, 0.5,
        ];

        let faces = decode_faces(&scores, &boxes, 200, 100, &config()).unwrap();
        assert_eq!(faces.len(), 1);
        assert!((faces[0].x1 - 20.0).abs() < 1e-3);
        assert!((faces[0].y1 - 10.0).abs() < 1e-3);
        assert!((faces[0].x2 - 60.0).abs() < 1e-3);
        assert!((faces[0].y2 - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_decode_orders_by_score() {
        let scores = [0.2, 0.8, 0.01, 0.99];
        let boxes = [
            0.0, 0.0, 0.1, 0.1, //
            0.5, 0.5, 0.9, 0.9,
        ];

        let faces = decode_faces(&scores, &boxes, 100, 100, &config()).unwrap();
        assert_eq!(faces.len(), 2);
        assert!((faces[0].x1 - 50.0).abs() < 1e-3);
        assert!(faces[1].x1.abs() < 1e-3);
    }

    #[test]
    fn test_decode_no_faces() {
        let scores = [0.9, 0.1];
        let boxes = [0.0, 0.0, 1.0, 1.0];
        assert!(decode_faces(&scores, &boxes, 10, 10, &config()).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_mismatched_outputs() {
        let scores = [0.1, 0.9, 0.1, 0.9];
        let boxes = [0.0, 0.0, 1.0, 1.0];
        assert!(decode_faces(&scores, &boxes, 10, 10, &config()).is_err());
    }

    #[test]
    fn test_max_faces_limit() {
        let scores = [0.0, 0.9, 0.0, 0.9, 0.0, 0.9];
        let boxes = [
            0.0, 0.0, 0.1, 0.1, //
            0.3, 0.3, 0.4, 0.4, //
            0.6, 0.6, 0.7, 0.7,
        ];
        let config = FaceLocatorConfig {
            max_faces: 2,
            ..config()
        };
        assert_eq!(decode_faces(&scores, &boxes, 100, 100, &config).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_model() {
        let err = OnnxFaceLocator::new(config()).err().unwrap();
        assert!(matches!(err, VisionError::ModelNotFound(_)));
    }
}
