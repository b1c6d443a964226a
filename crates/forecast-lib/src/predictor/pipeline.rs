//! Serving pipeline: validate, look up, scale, predict, assemble
//!
//! Every call is a single inference attempt against an immutable registry.
//! There is no retry: failures are deterministic for a given input and
//! registry.

use super::registry::ModelRegistry;
use crate::error::{ForecastError, ForecastResult};
use crate::models::{Forecast, Prefix, RawInput, SERIES_LEN};
use crate::observability::ForecastMetrics;
use crate::validation;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Prediction pipeline over a shared registry
#[derive(Clone)]
pub struct PredictionPipeline {
    registry: Arc<ModelRegistry>,
    metrics: ForecastMetrics,
}

impl PredictionPipeline {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            metrics: ForecastMetrics::new(),
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Validate a raw request and forecast it
    pub fn predict_raw(&self, input: Option<&RawInput>) -> ForecastResult<Forecast> {
        let start = Instant::now();
        let result = validation::validate(input)
            .map_err(ForecastError::from)
            .and_then(|prefix| self.predict(&prefix));
        self.metrics
            .observe_prediction_latency(start.elapsed().as_secs_f64());

        match &result {
            Ok(forecast) => self.metrics.inc_predictions(forecast.days_used),
            Err(e) => self.metrics.inc_prediction_errors(e.kind()),
        }
        result
    }

    /// Forecast a validated prefix
    pub fn predict(&self, prefix: &Prefix) -> ForecastResult<Forecast> {
        let days = prefix.days();
        let unit = self
            .registry
            .get(days)
            .ok_or(ForecastError::UnsupportedLength(days))?;

        let remainder = unit.predict_remainder(prefix.values())?;

        let timeline: Vec<f64> = prefix
            .values()
            .iter()
            .chain(&remainder)
            .map(|v| round_half_away(*v))
            .collect();

        if timeline.len() != SERIES_LEN {
            return Err(ForecastError::Prediction(format!(
                "assembled {} points, expected {}",
                timeline.len(),
                SERIES_LEN
            )));
        }

        debug!(days_used = days, "Forecast assembled");
        Ok(Forecast {
            timeline,
            days_used: days,
        })
    }
}

/// Nearest integer, ties away from zero. Negative values pass through and
/// magnitudes beyond the integer range are kept as is.
fn round_half_away(value: f64) -> f64 {
    value.round()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SUPPORTED_PREFIX_LENGTHS;
    use crate::predictor::unit::test_support::counting_unit;
    use crate::predictor::ScalerModelUnit;
    use crate::training::{ElasticNet, StandardScaler};
    use serde_json::json;

    fn pipeline(lengths: impl IntoIterator<Item = usize>) -> PredictionPipeline {
        PredictionPipeline::new(Arc::new(ModelRegistry::from_units(
            lengths.into_iter().map(counting_unit),
        )))
    }

    fn raw(value: serde_json::Value) -> RawInput {
        RawInput::from_json(&value).unwrap()
    }

    #[test]
    fn test_timeline_has_thirty_points_for_every_length() {
        let pipeline = pipeline(SUPPORTED_PREFIX_LENGTHS);
        for days in SUPPORTED_PREFIX_LENGTHS {
            let values: Vec<f64> = (0..days).map(|d| 10.0 + d as f64 + 0.4).collect();
            let prefix = Prefix::from_values(values.clone()).unwrap();
            let forecast = pipeline.predict(&prefix).unwrap();

            assert_eq!(forecast.timeline.len(), SERIES_LEN);
            assert_eq!(forecast.days_used, days);
            for (out, input) in forecast.timeline.iter().zip(&values) {
                assert_eq!(*out, input.round());
            }
        }
    }

    #[test]
    fn test_counting_continuation() {
        let pipeline = pipeline([3]);
        let forecast = pipeline
            .predict_raw(Some(&raw(json!({"day1": 10, "day2": 11, "day3": 12}))))
            .unwrap();
        let expected: Vec<f64> = (10..40).map(f64::from).collect();
        assert_eq!(forecast.timeline, expected);
        assert_eq!(forecast.days_used, 3);
    }

    #[test]
    fn test_days_used_ignores_gapped_fields() {
        let pipeline = pipeline(SUPPORTED_PREFIX_LENGTHS);
        let forecast = pipeline
            .predict_raw(Some(&raw(json!({"day1": 5, "day2": 3, "day4": 9, "day7": 1}))))
            .unwrap();
        assert_eq!(forecast.days_used, 2);
        assert_eq!(&forecast.timeline[..2], &[5.0, 3.0]);
    }

    #[test]
    fn test_unsupported_length() {
        let pipeline = pipeline(1..=5);
        let input = RawInput::from_days(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert!(matches!(
            pipeline.predict_raw(Some(&input)),
            Err(ForecastError::UnsupportedLength(7))
        ));
    }

    #[test]
    fn test_validation_errors_pass_through() {
        let pipeline = pipeline(SUPPORTED_PREFIX_LENGTHS);
        let err = pipeline.predict_raw(Some(&raw(json!({"day1": -3})))).unwrap_err();
        assert_eq!(err.to_string(), "values must be non-negative numbers");
        let err = pipeline.predict_raw(None).unwrap_err();
        assert_eq!(err.to_string(), "no data provided");
    }

    #[test]
    fn test_rounding_ties_away_from_zero() {
        assert_eq!(round_half_away(2.5), 3.0);
        assert_eq!(round_half_away(-2.5), -3.0);
        assert_eq!(round_half_away(0.49), 0.0);
    }

    #[test]
    fn test_negative_predictions_not_clamped() {
        let scaler = StandardScaler {
            mean: vec![0.0],
            scale: vec![1.0],
        };
        let model = ElasticNet {
            coefficients: vec![vec![0.0]; SERIES_LEN - 1],
            intercepts: vec![-4.6; SERIES_LEN - 1],
        };
        let unit = ScalerModelUnit::new(1, scaler, model).unwrap();
        let pipeline = PredictionPipeline::new(Arc::new(ModelRegistry::from_units([unit])));

        let forecast = pipeline
            .predict(&Prefix::from_values(vec![1.0]).unwrap())
            .unwrap();
        assert_eq!(forecast.timeline[0], 1.0);
        assert!(forecast.timeline[1..].iter().all(|v| *v == -5.0));
    }

    #[test]
    fn test_large_values_survive_rounding() {
        let pipeline = pipeline([1]);
        let forecast = pipeline
            .predict_raw(Some(&raw(json!({"day1": 1e20}))))
            .unwrap();
        assert_eq!(forecast.timeline[0], 1e20);
        assert_eq!(forecast.timeline[1], 1e20 + 1.0);
        assert!(forecast.timeline.iter().all(|v| v.is_finite()));
    }
}
