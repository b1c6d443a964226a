//! HTTP API: prediction, health checks and Prometheus metrics

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use forecast_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    observability::StructuredLogger,
    PredictionPipeline, RawInput,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: PredictionPipeline,
    pub health_registry: HealthRegistry,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        pipeline: PredictionPipeline,
        health_registry: HealthRegistry,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            pipeline,
            health_registry,
            logger,
        }
    }
}

/// Successful prediction body
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<f64>,
    pub days_used: usize,
}

/// Error body for every failed prediction
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Interpret the request body. Missing or malformed JSON counts as no data.
fn parse_body(body: &[u8]) -> Option<RawInput> {
    if body.is_empty() {
        return None;
    }
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| RawInput::from_json(&value))
}

/// Forecast the 30-day timeline from `day1`..`day7`
async fn predict(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let start = Instant::now();
    let input = parse_body(&body);

    match state.pipeline.predict_raw(input.as_ref()) {
        Ok(forecast) => {
            state
                .health_registry
                .mark_recovered(components::PREDICTOR)
                .await;
            state
                .logger
                .log_prediction(forecast.days_used, start.elapsed().as_micros());
            (
                StatusCode::OK,
                Json(PredictResponse {
                    predictions: forecast.timeline,
                    days_used: forecast.days_used,
                }),
            )
                .into_response()
        }
        Err(e) if e.is_client_error() => {
            state.logger.log_rejection(e.kind(), &e.to_string());
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.public_message(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            state.logger.log_failure(e.kind(), &e.to_string());
            state
                .health_registry
                .set_degraded(components::PREDICTOR, format!("last failure: {}", e.kind()))
                .await;
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.public_message(),
                }),
            )
                .into_response()
        }
    }
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/predict", post(predict))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .layer(cors)
        .with_state(state)
}

/// Start the API server
pub async fn serve(addr: String, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
