//! Facial expression classification with a ViT ONNX export.
//!
//! The model takes a 224x224 RGB crop normalized to `(p / 255 - 0.5) / 0.5`
//! and returns seven logits, one per [`Emotion`], in id order.

use std::path::PathBuf;
use std::sync::Mutex;

use image::{DynamicImage, GenericImageView};
use ort::session::Session;
use ort::value::Value;
use tracing::info;

use emodet_models::{Classification, Emotion};

use crate::capability::EmotionClassifier;
use crate::config::VisionConfig;
use crate::error::{VisionError, VisionResult};
use crate::onnx::{chw_tensor, create_session, rgb_to_chw, Normalization};

const INPUT_SIZE: u32 = 224;

const NORMALIZATION: Normalization = Normalization {
    scale: 1.0 / 255.0,
    mean: 0.5,
    std: 0.5,
};

/// Name of the logits output in HF exports.
const LOGITS_OUTPUT: &str = "logits";

/// Configuration for the expression classifier.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub model_path: PathBuf,
    pub model_name: String,
}

impl From<&VisionConfig> for ClassifierConfig {
    fn from(config: &VisionConfig) -> Self {
        Self {
            model_path: config.emotion_model_path.clone(),
            model_name: config.emotion_model_name.clone(),
        }
    }
}

/// ONNX Runtime-backed expression classifier.
pub struct OnnxEmotionClassifier {
    session: Mutex<Session>,
    config: ClassifierConfig,
}

impl OnnxEmotionClassifier {
    pub fn new(config: ClassifierConfig) -> VisionResult<Self> {
        let session = Mutex::new(create_session(&config.model_path, "emotion_classifier")?);
        info!(
            model_name = %config.model_name,
            model_path = %config.model_path.display(),
            "Emotion classifier initialized"
        );
        Ok(Self { session, config })
    }

    fn preprocess(&self, face: &DynamicImage) -> VisionResult<Value> {
        let resized = face
            .resize_exact(INPUT_SIZE, INPUT_SIZE, image::imageops::FilterType::Triangle)
            .to_rgb8();
        chw_tensor(rgb_to_chw(&resized, NORMALIZATION), INPUT_SIZE, INPUT_SIZE)
    }

    fn run_inference(&self, input: Value) -> VisionResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| VisionError::classification_failed("Session lock poisoned"))?;

        let outputs = session.run(ort::inputs![input]).map_err(|e| {
            VisionError::classification_failed(format!("ONNX inference failed: {}", e))
        })?;

        let logits = outputs
            .get(LOGITS_OUTPUT)
            .ok_or_else(|| VisionError::classification_failed("Missing logits tensor"))?
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                VisionError::classification_failed(format!("Failed to extract logits: {}", e))
            })?
            .1
            .to_vec();

        Ok(logits)
    }
}

impl EmotionClassifier for OnnxEmotionClassifier {
    fn classify(&self, face: &DynamicImage) -> VisionResult<Classification> {
        let (width, height) = face.dimensions();
        if width == 0 || height == 0 {
            return Err(VisionError::classification_failed("empty face crop"));
        }
        let input = self.preprocess(face)?;
        let logits = self.run_inference(input)?;
        classify_logits(&logits)
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

/// Pick the winning emotion from raw logits.
fn classify_logits(logits: &[f32]) -> VisionResult<Classification> {
    if logits.len() != Emotion::ALL.len() {
        return Err(VisionError::classification_failed(format!(
            "expected {} logits, got {}",
            Emotion::ALL.len(),
            logits.len()
        )));
    }

    let probs = softmax(logits);
    let (best, confidence) = probs
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or_else(|| VisionError::classification_failed("empty logits"))?;

    if !confidence.is_finite() {
        return Err(VisionError::classification_failed("non-finite logits"));
    }

    let emotion = Emotion::from_id(best)
        .ok_or_else(|| VisionError::classification_failed(format!("unknown class id {best}")))?;

    Ok(Classification::from((emotion, confidence)))
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}
