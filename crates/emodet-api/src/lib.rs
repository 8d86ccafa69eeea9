//! Axum HTTP API server for emotion detection.
//!
//! This crate provides:
//! - `POST /predict-emotion/` multipart upload endpoint
//! - Liveness, readiness and Prometheus metrics endpoints
//! - Rate limiting, request ids and security headers

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
