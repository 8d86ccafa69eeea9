//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "emodet_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "emodet_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "emodet_http_requests_in_flight";

    // Prediction metrics
    pub const PREDICTIONS_TOTAL: &str = "emodet_predictions_total";
    pub const PREDICTIONS_FAILED_TOTAL: &str = "emodet_predictions_failed_total";
    pub const PREDICTION_DURATION_SECONDS: &str = "emodet_prediction_duration_seconds";
    pub const FACES_PER_IMAGE: &str = "emodet_faces_per_image";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "emodet_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path).to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a completed prediction.
pub fn record_prediction(face_count: usize, duration_secs: f64) {
    counter!(names::PREDICTIONS_TOTAL).increment(1);
    histogram!(names::PREDICTION_DURATION_SECONDS).record(duration_secs);
    histogram!(names::FACES_PER_IMAGE).record(face_count as f64);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint).to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Collapse paths to a bounded label set.
fn sanitize_path(path: &str) -> &'static str {
    match path.trim_end_matches('/') {
        "/predict-emotion" => "/predict-emotion",
        "/health" => "/health",
        "/healthz" => "/healthz",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        _ => "other",
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("/predict-emotion/"), "/predict-emotion");
        assert_eq!(sanitize_path("/predict-emotion"), "/predict-emotion");
        assert_eq!(sanitize_path("/healthz"), "/healthz");
        assert_eq!(sanitize_path("/wp-admin/setup.php"), "other");
    }
}
