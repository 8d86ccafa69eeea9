//! Per-image emotion processing.
//!
//! Runs the face locator once, then crops and classifies every detected face
//! as an independent unit. A failure inside one face unit (bad box, crop
//! error, classifier error, even a panic) becomes an error-flagged
//! [`FaceResult`] for that face and never aborts its siblings. Only a locator
//! failure fails the whole image.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use image::DynamicImage;
use metrics::counter;
use tracing::{debug, error, info, warn};

use emodet_models::{BoundingBox, FaceResult};

use crate::capability::{EmotionClassifier, FaceLocator};
use crate::classifier::{ClassifierConfig, OnnxEmotionClassifier};
use crate::config::{EmotionConfig, VisionConfig};
use crate::crop::crop_face;
use crate::error::{VisionError, VisionResult};
use crate::face_locator::{FaceLocatorConfig, OnnxFaceLocator};

/// Counter of processed faces, labelled by `outcome` (success / failed).
pub const FACES_PROCESSED_TOTAL: &str = "emodet_faces_processed_total";

/// Terminal state of one face unit.
#[derive(Debug, Clone, PartialEq)]
pub enum FaceOutcome {
    Success(FaceResult),
    Failed { index: usize, reason: String },
}

impl FaceOutcome {
    /// Flatten into the client-facing record.
    pub fn into_result(self) -> FaceResult {
        match self {
            FaceOutcome::Success(result) => result,
            FaceOutcome::Failed { index, reason } => FaceResult::failed(index, reason),
        }
    }
}

/// Orchestrates detect -> crop -> classify -> assemble for one image.
///
/// Holds shared, read-only handles; cloning is cheap and every call to
/// [`EmotionProcessor::process`] is independent.
#[derive(Clone)]
pub struct EmotionProcessor {
    locator: Arc<dyn FaceLocator>,
    classifier: Arc<dyn EmotionClassifier>,
    config: Arc<EmotionConfig>,
}

impl EmotionProcessor {
    pub fn new(
        locator: Arc<dyn FaceLocator>,
        classifier: Arc<dyn EmotionClassifier>,
        config: Arc<EmotionConfig>,
    ) -> Self {
        Self {
            locator,
            classifier,
            config,
        }
    }

    /// Load both ONNX backends and the emotion config.
    ///
    /// Any failure here is a setup failure: the service must not start.
    pub fn load(config: &VisionConfig) -> VisionResult<Self> {
        let locator = OnnxFaceLocator::new(FaceLocatorConfig::from(config))?;
        let classifier = OnnxEmotionClassifier::new(ClassifierConfig::from(config))?;
        let emotion = config.emotion_config()?;

        Ok(Self::new(
            Arc::new(locator),
            Arc::new(classifier),
            Arc::new(emotion),
        ))
    }

    pub fn config(&self) -> &EmotionConfig {
        &self.config
    }

    pub fn locator_name(&self) -> &'static str {
        self.locator.name()
    }

    pub fn classifier_model(&self) -> &str {
        self.classifier.model_name()
    }

    /// Locate and classify every face in `image`.
    ///
    /// # Returns
    /// One [`FaceResult`] per located box, in locator order with 1-based
    /// indices. An empty vector when no faces are found.
    ///
    /// # Errors
    /// Only when the face locator itself fails; no partial results are
    /// returned in that case.
    pub fn process(&self, image: &DynamicImage) -> VisionResult<Vec<FaceResult>> {
        info!(locator = self.locator.name(), "Starting emotion processing on image");

        let boxes = self.locator.detect(image).map_err(|e| {
            debug!(error = %e, locator = self.locator.name(), "Face location failed");
            e
        })?;

        if boxes.is_empty() {
            warn!("No faces detected in the image");
            return Ok(Vec::new());
        }

        let results: Vec<FaceResult> = boxes
            .iter()
            .enumerate()
            .map(|(i, bbox)| self.process_face(image, i + 1, bbox))
            .map(FaceOutcome::into_result)
            .collect();

        let failed = results.iter().filter(|r| r.is_error()).count();
        info!(faces = results.len(), failed, "Emotion processing completed");

        Ok(results)
    }

    /// Run one face unit to a terminal state.
    pub fn process_face(&self, image: &DynamicImage, index: usize, bbox: &BoundingBox) -> FaceOutcome {
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| self.classify_face(image, index, bbox)));

        let outcome = match attempt {
            Ok(Ok(result)) => FaceOutcome::Success(result),
            Ok(Err(e)) => FaceOutcome::Failed {
                index,
                reason: e.to_string(),
            },
            Err(payload) => FaceOutcome::Failed {
                index,
                reason: format!("face processing panicked: {}", panic_message(payload.as_ref())),
            },
        };

        match &outcome {
            FaceOutcome::Success(_) => {
                counter!(FACES_PROCESSED_TOTAL, "outcome" => "success").increment(1);
            }
            FaceOutcome::Failed { reason, .. } => {
                error!(face_index = index, error = %reason, "Error processing face");
                counter!(FACES_PROCESSED_TOTAL, "outcome" => "failed").increment(1);
            }
        }

        outcome
    }

    fn classify_face(
        &self,
        image: &DynamicImage,
        index: usize,
        bbox: &BoundingBox,
    ) -> VisionResult<FaceResult> {
        let pixel_box = bbox.truncate();
        let face = crop_face(image, pixel_box)?;
        let classification = self.classifier.classify(&face)?;

        if !classification.confidence.is_finite() {
            return Err(VisionError::classification_failed(format!(
                "classifier returned non-finite confidence for '{}'",
                classification.emotion_label
            )));
        }

        info!(
            face_index = index,
            emotion = %classification.emotion_label,
            confidence = format_args!("{:.4}", classification.confidence),
            "Detected emotion"
        );

        let emoji = self.config.emoji_map.lookup(&classification.emotion_label);
        Ok(FaceResult::success(index, pixel_box, &classification, emoji))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use emodet_models::Classification;
    use image::RgbImage;

    struct FixedLocator(Vec<BoundingBox>);

    impl FaceLocator for FixedLocator {
        fn detect(&self, _image: &DynamicImage) -> VisionResult<Vec<BoundingBox>> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct BrokenLocator;

    impl FaceLocator for BrokenLocator {
        fn detect(&self, _image: &DynamicImage) -> VisionResult<Vec<BoundingBox>> {
            Err(VisionError::detection_failed("corrupt internal state"))
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    /// Returns the queued classifications in call order; errors past the end.
    struct ScriptedClassifier {
        script: Vec<Result<Classification, String>>,
        calls: AtomicUsize,
    }

    impl ScriptedClassifier {
        fn new(script: Vec<Result<Classification, String>>) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl EmotionClassifier for ScriptedClassifier {
        fn classify(&self, _face: &DynamicImage) -> VisionResult<Classification> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script.get(call) {
                Some(Ok(c)) => Ok(c.clone()),
                Some(Err(msg)) => Err(VisionError::classification_failed(msg.clone())),
                None => Err(VisionError::classification_failed("script exhausted")),
            }
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    struct PanickingClassifier;

    impl EmotionClassifier for PanickingClassifier {
        fn classify(&self, _face: &DynamicImage) -> VisionResult<Classification> {
            panic!("model exploded");
        }

        fn model_name(&self) -> &str {
            "panicking"
        }
    }

    fn image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(200, 200))
    }

    fn processor(
        locator: impl FaceLocator + 'static,
        classifier: impl EmotionClassifier + 'static,
    ) -> EmotionProcessor {
        EmotionProcessor::new(
            Arc::new(locator),
            Arc::new(classifier),
            Arc::new(EmotionConfig::default()),
        )
    }

    fn happy() -> Classification {
        Classification::new("Happy", 3, 0.9567)
    }

    #[test]
    fn test_no_faces_returns_empty() {
        let p = processor(FixedLocator(vec![]), ScriptedClassifier::new(vec![]));
        assert!(p.process(&image()).unwrap().is_empty());
    }

    #[test]
    fn test_single_face_success() {
        let p = processor(
            FixedLocator(vec![BoundingBox::new(10.7, 20.2, 110.9, 140.5)]),
            ScriptedClassifier::new(vec![Ok(happy())]),
        );

        let results = p.process(&image()).unwrap();
        assert_eq!(
            results,
            vec![FaceResult {
                face_index: 1,
                bbox: [10, 20, 110, 140],
                emotion_label: "Happy".to_string(),
                emotion_id: Some(3),
                confidence: 95.67,
                emoji: "😊".to_string(),
                error: None,
            }]
        );
    }

    #[test]
    fn test_degenerate_second_face_is_isolated() {
        let p = processor(
            FixedLocator(vec![
                BoundingBox::new(10.0, 10.0, 60.0, 60.0),
                BoundingBox::new(80.0, 80.0, 80.0, 120.0),
            ]),
            ScriptedClassifier::new(vec![Ok(happy())]),
        );

        let results = p.process(&image()).unwrap();
        assert_eq!(results.len(), 2);

        assert_eq!(results[0].face_index, 1);
        assert!(results[0].error.is_none());
        assert_eq!(results[0].bbox, [10, 10, 60, 60]);

        assert_eq!(results[1].face_index, 2);
        assert_eq!(results[1].bbox, [0, 0, 0, 0]);
        assert_eq!(results[1].emotion_label, "Error");
        assert_eq!(results[1].emotion_id, None);
        assert_eq!(results[1].confidence, 0.0);
        assert_eq!(results[1].emoji, "");
        assert!(results[1].error.as_deref().unwrap().contains("degenerate"));
    }

    #[test]
    fn test_classifier_failure_does_not_stop_later_faces() {
        let p = processor(
            FixedLocator(vec![
                BoundingBox::new(0.0, 0.0, 50.0, 50.0),
                BoundingBox::new(50.0, 50.0, 100.0, 100.0),
                BoundingBox::new(100.0, 100.0, 150.0, 150.0),
            ]),
            ScriptedClassifier::new(vec![
                Err("malformed crop".to_string()),
                Ok(Classification::new("Sad", 5, 0.5)),
                Ok(Classification::new("Bored", 9, 0.25)),
            ]),
        );

        let results = p.process(&image()).unwrap();
        let indices: Vec<usize> = results.iter().map(|r| r.face_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);

        assert!(results[0].is_error());
        assert!(results[0].error.as_deref().unwrap().contains("malformed crop"));

        assert_eq!(results[1].emotion_label, "Sad");
        assert_eq!(results[1].emoji, "😢");
        assert_eq!(results[1].confidence, 50.0);

        // Unknown label: no emoji, not an error
        assert_eq!(results[2].emotion_label, "Bored");
        assert_eq!(results[2].emoji, "");
        assert!(!results[2].is_error());
    }

    #[test]
    fn test_locator_failure_is_request_level() {
        let p = processor(BrokenLocator, ScriptedClassifier::new(vec![Ok(happy())]));
        let err = p.process(&image()).unwrap_err();
        assert!(matches!(err, VisionError::DetectionFailed(_)));
    }

    /// Counts ERROR events so request-level failures can be checked for double logging.
    struct ErrorCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for ErrorCounter {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() == tracing::Level::ERROR {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_locator_failure_not_logged_as_error() {
        use tracing_subscriber::layer::SubscriberExt;

        let errors = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(ErrorCounter(errors.clone()));
        let p = processor(BrokenLocator, ScriptedClassifier::new(vec![Ok(happy())]));

        tracing::subscriber::with_default(subscriber, || {
            assert!(p.process(&image()).is_err());
        });

        // The API boundary logs it once; the orchestrator must not.
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_classifier_panic_is_isolated() {
        let p = processor(
            FixedLocator(vec![
                BoundingBox::new(0.0, 0.0, 10.0, 10.0),
                BoundingBox::new(10.0, 10.0, 20.0, 20.0),
            ]),
            PanickingClassifier,
        );

        let results = p.process(&image()).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_error()));
        assert!(results[0].error.as_deref().unwrap().contains("model exploded"));
    }

    #[test]
    fn test_non_finite_confidence_is_face_error() {
        let p = processor(
            FixedLocator(vec![BoundingBox::new(0.0, 0.0, 10.0, 10.0)]),
            ScriptedClassifier::new(vec![Ok(Classification::new("Happy", 3, f32::NAN))]),
        );

        let results = p.process(&image()).unwrap();
        assert!(results[0].is_error());
        assert_eq!(results[0].bbox, [0, 0, 0, 0]);
    }

    #[test]
    fn test_out_of_bounds_box_is_still_classified() {
        let p = processor(
            FixedLocator(vec![BoundingBox::new(-20.5, 150.0, 40.0, 260.9)]),
            ScriptedClassifier::new(vec![Ok(happy())]),
        );

        let results = p.process(&image()).unwrap();
        assert!(!results[0].is_error());
        assert_eq!(results[0].bbox, [-20, 150, 40, 260]);
    }

    #[test]
    fn test_load_without_models_fails() {
        let config = VisionConfig {
            face_model_path: "/nonexistent/face.onnx".into(),
            ..VisionConfig::default()
        };
        let err = EmotionProcessor::load(&config).err().unwrap();
        assert!(matches!(err, VisionError::ModelNotFound(_)));
    }

    #[test]
    fn test_face_outcome_into_result() {
        let failed = FaceOutcome::Failed {
            index: 4,
            reason: "nope".to_string(),
        };
        let r = failed.into_result();
        assert_eq!(r.face_index, 4);
        assert_eq!(r.error.as_deref(), Some("nope"));
    }
}
