//! Observability infrastructure for the forecasting service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, predictions per day count,
//!   errors per kind, loaded models, training scores)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter_vec, register_int_gauge,
    GaugeVec, Histogram, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ForecastMetricsInner> = OnceLock::new();

struct ForecastMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    prediction_errors_total: IntCounterVec,
    models_loaded: IntGauge,
    model_test_r2: GaugeVec,
}

impl ForecastMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "daycast_prediction_latency_seconds",
                "Time spent validating input and evaluating a model",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "daycast_predictions_total",
                "Successful predictions by number of days supplied",
                &["days"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "daycast_prediction_errors_total",
                "Failed predictions by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            models_loaded: register_int_gauge!(
                "daycast_models_loaded",
                "Number of prefix lengths with a loaded model"
            )
            .expect("Failed to register models_loaded"),

            model_test_r2: register_gauge_vec!(
                "daycast_model_test_r2",
                "Held-out R2 score of the last training run per prefix length",
                &["days"]
            )
            .expect("Failed to register model_test_r2"),
        }
    }
}

/// Metrics handle for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct ForecastMetrics {
    _private: (),
}

impl Default for ForecastMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ForecastMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ForecastMetricsInner {
        GLOBAL_METRICS.get_or_init(ForecastMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, days: usize) {
        self.inner()
            .predictions_total
            .with_label_values(&[&days.to_string()])
            .inc();
    }

    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[kind])
            .inc();
    }

    pub fn set_models_loaded(&self, count: usize) {
        self.inner().models_loaded.set(count as i64);
    }

    pub fn set_model_test_r2(&self, days: usize, score: f64) {
        self.inner()
            .model_test_r2
            .with_label_values(&[&days.to_string()])
            .set(score);
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, model_dir: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            model_dir = %model_dir,
            "Forecast service started"
        );
    }

    pub fn log_models_loaded(&self, loaded: &[usize]) {
        if loaded.is_empty() {
            warn!(
                event = "models_loaded",
                service = %self.service,
                count = 0,
                "No models loaded, every prediction will be rejected"
            );
        } else {
            info!(
                event = "models_loaded",
                service = %self.service,
                count = loaded.len(),
                days = ?loaded,
                "Models loaded"
            );
        }
    }

    pub fn log_prediction(&self, days_used: usize, elapsed_us: u128) {
        info!(
            event = "prediction_generated",
            service = %self.service,
            days_used = days_used,
            elapsed_us = elapsed_us,
            "Generated forecast"
        );
    }

    /// Caller-caused failures; the reason is already public
    pub fn log_rejection(&self, kind: &str, reason: &str) {
        info!(
            event = "prediction_rejected",
            service = %self.service,
            kind = %kind,
            reason = %reason,
            "Prediction request rejected"
        );
    }

    /// Internal faults; the detail stays in the log only
    pub fn log_failure(&self, kind: &str, detail: &str) {
        error!(
            event = "prediction_failed",
            service = %self.service,
            kind = %kind,
            detail = %detail,
            "Prediction failed"
        );
    }

    pub fn log_model_trained(&self, days: usize, train_r2: f64, test_r2: f64, path: &str) {
        info!(
            event = "model_trained",
            service = %self.service,
            days = days,
            train_r2 = train_r2,
            test_r2 = test_r2,
            path = %path,
            "Model trained and saved"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Forecast service shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_handles_share_registry() {
        let metrics = ForecastMetrics::new();
        let other = metrics.clone();

        metrics.observe_prediction_latency(0.0002);
        metrics.inc_predictions(3);
        other.inc_prediction_errors("validation");
        other.set_models_loaded(5);
        other.set_model_test_r2(3, 0.97);

        let families = prometheus::gather();
        let names: Vec<&str> = families.iter().map(|f| f.get_name()).collect();
        assert!(names.contains(&"daycast_predictions_total"));
        assert!(names.contains(&"daycast_models_loaded"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("daycast-test");
        assert_eq!(logger.service, "daycast-test");
    }
}
