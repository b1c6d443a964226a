//! daycast-server - 30-day forecast service
//!
//! Loads every persisted model once at startup and serves predictions
//! over HTTP.

use anyhow::{Context, Result};
use daycast_server::{api, config::ServerConfig};
use forecast_lib::{
    health::{components, HealthRegistry},
    observability::{ForecastMetrics, StructuredLogger},
    ModelRegistry, ModelStore, PredictionPipeline,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = ServerConfig::load()?;
    let logger = StructuredLogger::new(&config.service_name);
    logger.log_startup(SERVICE_VERSION, &config.model_dir.display().to_string());

    let health_registry = HealthRegistry::new();
    health_registry.register(components::PREDICTOR).await;

    // A corrupt artifact aborts startup
    let store = ModelStore::new(&config.model_dir);
    let registry = ModelRegistry::load(&store).with_context(|| {
        format!("Failed to load models from {}", config.model_dir.display())
    })?;

    let loaded = registry.loaded_lengths();
    ForecastMetrics::new().set_models_loaded(loaded.len());
    logger.log_models_loaded(&loaded);
    health_registry.set_models_loaded(loaded).await;

    let pipeline = PredictionPipeline::new(Arc::new(registry));
    let app_state = Arc::new(api::AppState::new(
        pipeline,
        health_registry,
        logger.clone(),
    ));

    let mut api_handle = tokio::spawn(api::serve(config.bind_addr(), app_state));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            logger.log_shutdown("SIGINT received");
        }
        joined = &mut api_handle => {
            let reason = match joined {
                Ok(Ok(())) => "API server exited".to_string(),
                Ok(Err(e)) => format!("API server failed: {e:#}"),
                Err(e) => format!("API server task panicked: {e}"),
            };
            error!(reason = %reason, "API server stopped");
            logger.log_shutdown(&reason);
            anyhow::bail!(reason);
        }
    }

    info!("Shutting down");
    Ok(())
}
