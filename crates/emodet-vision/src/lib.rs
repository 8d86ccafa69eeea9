//! Face location and emotion classification.
//!
//! This crate provides:
//! - Capability traits for face locators and emotion classifiers
//! - ONNX Runtime backends for both (UltraFace, ViT expression model)
//! - Image decoding and Pillow-compatible face cropping
//! - The per-image orchestrator with per-face fault isolation

pub mod capability;
pub mod classifier;
pub mod config;
pub mod crop;
pub mod emoji;
pub mod error;
pub mod face_locator;
pub mod onnx;
pub mod processor;

pub use capability::{EmotionClassifier, FaceLocator};
pub use classifier::{ClassifierConfig, OnnxEmotionClassifier};
pub use config::{EmotionConfig, VisionConfig};
pub use crop::{crop_face, decode_image};
pub use emoji::EmojiMap;
pub use error::{VisionError, VisionResult};
pub use face_locator::{FaceLocatorConfig, OnnxFaceLocator};
pub use processor::{EmotionProcessor, FaceOutcome};
