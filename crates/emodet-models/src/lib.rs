//! Shared data models for the emotion detection service.
//!
//! This crate provides Serde-serializable types for:
//! - Face bounding boxes as produced by a face locator
//! - Emotion labels and classifier output
//! - Per-face results and the prediction response envelope

pub mod bounding_box;
pub mod emotion;
pub mod face_result;
pub mod response;

// Re-export common types
pub use bounding_box::{BoundingBox, PixelBox};
pub use emotion::{Classification, Emotion};
pub use face_result::{FaceResult, ERROR_LABEL};
pub use response::PredictResponse;
