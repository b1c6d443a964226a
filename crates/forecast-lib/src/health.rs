//! Health check infrastructure for the forecasting service
//!
//! Tracks component health and readiness. The service is ready once the
//! model registry has loaded and at least one prefix length is servable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is functioning normally
    Healthy,
    /// Component is experiencing issues but still operational
    Degraded,
    /// Component has failed
    Unhealthy,
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across all components
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        let mut has_degraded = false;
        for health in components.values() {
            match health.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => has_degraded = true,
                ComponentStatus::Healthy => {}
            }
        }
        if has_degraded {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    /// Prefix lengths that can currently be served
    pub supported_days: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const MODEL_REGISTRY: &str = "model_registry";
    pub const PREDICTOR: &str = "predictor";
}

#[derive(Debug, Default)]
struct ServingState {
    ready: bool,
    supported_days: Vec<usize>,
}

/// Health registry for tracking component health
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    serving: Arc<RwLock<ServingState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components
            .write()
            .await
            .insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Mark `name` healthy again if it was degraded or unhealthy.
    ///
    /// Returns whether the status changed. Only a read lock is taken when
    /// the component is already healthy.
    pub async fn mark_recovered(&self, name: &str) -> bool {
        let needs_reset = self
            .components
            .read()
            .await
            .get(name)
            .is_some_and(|health| health.status != ComponentStatus::Healthy);
        if needs_reset {
            self.set_healthy(name).await;
        }
        needs_reset
    }

    /// Record which prefix lengths are servable and mark the service ready.
    ///
    /// A registry with gaps is degraded; an empty one is unhealthy.
    pub async fn set_models_loaded(&self, supported_days: Vec<usize>) {
        let health = match supported_days.len() {
            0 => ComponentHealth::unhealthy("no models loaded"),
            n if n < crate::models::MAX_PREFIX_DAYS => {
                ComponentHealth::degraded(format!("models loaded for {:?} days only", supported_days))
            }
            _ => ComponentHealth::healthy(),
        };
        self.update(components::MODEL_REGISTRY, health).await;

        let mut serving = self.serving.write().await;
        serving.ready = true;
        serving.supported_days = supported_days;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let (ready, supported_days) = {
            let serving = self.serving.read().await;
            (serving.ready, serving.supported_days.clone())
        };
        let health = self.health().await;

        let reason = if !ready {
            Some("Model registry not yet loaded".to_string())
        } else if supported_days.is_empty() {
            Some("No models loaded".to_string())
        } else if health.status == ComponentStatus::Unhealthy {
            Some("Critical component unhealthy".to_string())
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            supported_days,
            reason,
        }
    }
}
