//! ONNX Runtime session setup and tensor helpers shared by the model backends.

use std::path::Path;

use image::RgbImage;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use crate::error::{VisionError, VisionResult};

/// Per-channel normalization applied as `(pixel * scale - mean) / std`.
#[derive(Debug, Clone, Copy)]
pub struct Normalization {
    pub scale: f32,
    pub mean: f32,
    pub std: f32,
}

impl Normalization {
    #[inline]
    fn apply(&self, value: u8) -> f32 {
        (value as f32 * self.scale - self.mean) / self.std
    }
}

/// Create ONNX Runtime session with automatic execution provider selection.
///
/// `purpose` only feeds the log lines.
pub fn create_session(model_path: &Path, purpose: &str) -> VisionResult<Session> {
    if !model_path.exists() {
        return Err(VisionError::model_not_found(model_path));
    }

    let model_bytes = std::fs::read(model_path)
        .map_err(|e| VisionError::model_load(format!("Failed to read model file: {}", e)))?;
    debug!(purpose, bytes = model_bytes.len(), "Read model file");

    let builder = Session::builder()
        .map_err(|e| VisionError::model_load(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| VisionError::model_load(format!("Failed to set optimization level: {}", e)))?;

    // Try CUDA on Linux with cuda feature
    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!(purpose, "Using CUDA execution provider");
                return Ok(session);
            }
        }
        debug!(purpose, "CUDA execution provider not available, trying alternatives");
    }

    // Try CoreML on macOS
    #[cfg(target_os = "macos")]
    {
        use ort::execution_providers::CoreMLExecutionProvider;
        if let Ok(coreml_builder) = builder
            .clone()
            .with_execution_providers([CoreMLExecutionProvider::default().build()])
        {
            if let Ok(session) = coreml_builder.commit_from_memory(&model_bytes) {
                info!(purpose, "Using CoreML execution provider");
                return Ok(session);
            }
        }
        debug!(purpose, "CoreML execution provider not available, using CPU");
    }

    info!(purpose, model_path = %model_path.display(), "Using CPU execution provider");
    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| VisionError::model_load(format!("Failed to load ONNX model: {}", e)))
}

/// Convert an RGB image (HWC) into a normalized NCHW `f32` buffer.
pub fn rgb_to_chw(rgb: &RgbImage, norm: Normalization) -> Vec<f32> {
    let (w, h) = rgb.dimensions();
    let (w, h) = (w as usize, h as usize);
    let raw = rgb.as_raw();

    let mut chw = Vec::with_capacity(3 * h * w);
    for c in 0..3 {
        for y in 0..h {
            for x in 0..w {
                chw.push(norm.apply(raw[(y * w + x) * 3 + c]));
            }
        }
    }
    chw
}

/// Wrap an NCHW buffer into an ORT input tensor of shape `[1, 3, h, w]`.
pub fn chw_tensor(chw: Vec<f32>, width: u32, height: u32) -> VisionResult<Value> {
    let shape = vec![1usize, 3, height as usize, width as usize];
    Tensor::from_array((shape, chw.into_boxed_slice()))
        .map(Value::from)
        .map_err(|e| VisionError::internal(format!("Failed to create tensor: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_rgb_to_chw_layout() {
        let img = RgbImage::from_fn(2, 1, |x, _| if x == 0 { Rgb([1, 2, 3]) } else { Rgb([4, 5, 6]) });
        let identity = Normalization {
            scale: 1.0,
            mean: 0.0,
            std: 1.0,
        };

        assert_eq!(rgb_to_chw(&img, identity), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_normalization() {
        let img = RgbImage::from_pixel(1, 1, Rgb([255, 127, 0]));
        let ultraface = Normalization {
            scale: 1.0,
            mean: 127.0,
            std: 128.0,
        };

        let chw = rgb_to_chw(&img, ultraface);
        assert!((chw[0] - 1.0).abs() < 1e-6);
        assert!(chw[1].abs() < 1e-6);
        assert!((chw[2] + 127.0 / 128.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_model_is_setup_error() {
        let err = create_session(Path::new("/nonexistent/model.onnx"), "test").unwrap_err();
        assert!(matches!(err, VisionError::ModelNotFound(_)));
    }
}
