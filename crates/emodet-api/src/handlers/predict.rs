//! Emotion prediction handler.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use tracing::{debug, info};

use emodet_models::{FaceResult, PredictResponse};
use emodet_vision::{decode_image, VisionResult};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Multipart field holding the uploaded image.
pub const UPLOAD_FIELD: &str = "file";

/// Detect faces in the uploaded image and classify each one.
///
/// Decoding and inference run on the blocking pool. Per-face failures stay
/// inside the result list; only request-level failures become an [`ApiError`].
pub async fn predict_emotion(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<PredictResponse>> {
    let multipart = multipart.map_err(|rejection| ApiError::invalid_upload(rejection.body_text()))?;
    let bytes = read_upload(multipart).await?;
    debug!(bytes = bytes.len(), "Received upload");

    let started = Instant::now();
    let processor = state.processor.clone();
    let results = tokio::task::spawn_blocking(move || -> VisionResult<Vec<FaceResult>> {
        let image = decode_image(&bytes)?;
        processor.process(&image)
    })
    .await
    .map_err(|e| ApiError::internal(format!("processing task failed: {}", e)))??;

    let elapsed = started.elapsed();
    metrics::record_prediction(results.len(), elapsed.as_secs_f64());
    info!(
        faces = results.len(),
        duration_ms = elapsed.as_millis() as u64,
        "Prediction completed"
    );

    Ok(Json(PredictResponse::success(results)))
}

/// Pull the bytes of the upload field, skipping any other fields.
async fn read_upload(mut multipart: Multipart) -> ApiResult<Bytes> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            return Ok(field.bytes().await?);
        }
    }
    Err(ApiError::invalid_upload(format!(
        "missing '{}' field",
        UPLOAD_FIELD
    )))
}
