//! Forecasting library for 30-day series from a short observed prefix
//!
//! This crate provides:
//! - Input validation for `day1`..`day7` requests
//! - Windowing of full series into per-length training batches
//! - Standard scaling and elastic-net training per prefix length
//! - Artifact persistence and the read-only model registry
//! - The prediction pipeline that assembles the 30-point timeline
//! - Health checks and observability

pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod store;
pub mod training;
pub mod validation;

pub use error::{ForecastError, ForecastResult, ValidationError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ForecastMetrics, StructuredLogger};
pub use predictor::{ModelRegistry, PredictionPipeline, ScalerModelUnit};
pub use store::{ArtifactInfo, ModelStore};
