//! Capability traits for the two model-backed stages.
//!
//! The orchestrator only talks to these traits, so model backends can be
//! swapped (or stubbed in tests) without touching the per-face policy.

use image::DynamicImage;

use emodet_models::{BoundingBox, Classification};

use crate::error::VisionResult;

/// Face localization capability.
///
/// Implementations hold a loaded model that is shared read-only across
/// requests. Backends that need exclusive access to run inference must
/// serialize it internally.
pub trait FaceLocator: Send + Sync {
    /// Find candidate faces in a decoded image.
    ///
    /// # Returns
    /// Boxes in pixel space, in the locator's preferred order. An empty vector
    /// means no faces were found and is not an error. Boxes may extend past
    /// the image bounds.
    fn detect(&self, image: &DynamicImage) -> VisionResult<Vec<BoundingBox>>;

    /// Locator name for logging.
    fn name(&self) -> &'static str;
}

/// Emotion classification capability for a single face crop.
pub trait EmotionClassifier: Send + Sync {
    /// Classify the dominant emotion of a face crop.
    ///
    /// Must be deterministic for the same input and weights. Failures are
    /// reported as `Err`, never replaced by a default label.
    fn classify(&self, face: &DynamicImage) -> VisionResult<Classification>;

    /// Identifier of the loaded model.
    fn model_name(&self) -> &str;
}
