//! Application state.

use std::sync::Arc;

use emodet_vision::{EmotionProcessor, VisionConfig, VisionResult};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub processor: Arc<EmotionProcessor>,
}

impl AppState {
    /// Wrap an already-built processor.
    pub fn new(config: ApiConfig, processor: EmotionProcessor) -> Self {
        Self {
            config,
            processor: Arc::new(processor),
        }
    }

    /// Load the models described by `vision` and build the state.
    pub fn load(config: ApiConfig, vision: &VisionConfig) -> VisionResult<Self> {
        let processor = EmotionProcessor::load(vision)?;
        Ok(Self::new(config, processor))
    }
}
