//! Per-length training of scaler/model units
//!
//! Each prefix length is fitted independently. A failing length is skipped
//! with a warning; the remaining lengths still train.

use super::elastic_net::{r2_score, ElasticNet, ElasticNetParams};
use super::scaler::StandardScaler;
use super::windower::{check_lengths, WindowedBatches};
use crate::error::{ForecastError, ForecastResult};
use crate::models::{TrainingExample, SUPPORTED_PREFIX_LENGTHS};
use crate::predictor::ScalerModelUnit;
use crate::store::ModelStore;
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Default split seed
pub const DEFAULT_SEED: u64 = 30;

/// Default held-out fraction for the diagnostic score
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// Training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub params: ElasticNetParams,
    /// Fraction of each batch held out for the test score
    pub test_size: f64,
    /// Seed for the train/test shuffle
    pub seed: u64,
    /// Prefix lengths to train; batches for other lengths are ignored
    pub prefix_lengths: Vec<usize>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            params: ElasticNetParams::default(),
            test_size: DEFAULT_TEST_SIZE,
            seed: DEFAULT_SEED,
            prefix_lengths: SUPPORTED_PREFIX_LENGTHS.collect(),
        }
    }
}

/// Fit diagnostics for one trained prefix length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthReport {
    pub days: usize,
    pub train_examples: usize,
    pub test_examples: usize,
    pub train_r2: f64,
    pub test_r2: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// A prefix length that could not be trained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedLength {
    pub days: usize,
    pub reason: String,
}

/// Summary of a training run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub trained: Vec<LengthReport>,
    pub skipped: Vec<SkippedLength>,
}

/// Fits one [`ScalerModelUnit`] per prefix length
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(mut config: TrainingConfig) -> ForecastResult<Self> {
        config.params.validate()?;
        check_lengths(&config.prefix_lengths)?;
        if config.prefix_lengths.is_empty() {
            return Err(ForecastError::TrainingData(
                "no prefix lengths requested".to_string(),
            ));
        }
        config.prefix_lengths.sort_unstable();
        config.prefix_lengths.dedup();
        if !(config.test_size > 0.0 && config.test_size < 1.0) {
            return Err(ForecastError::TrainingData(format!(
                "test_size must be within (0, 1), got {}",
                config.test_size
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train every configured prefix length, returning the fitted units and a report.
    ///
    /// No examples for any configured length is fatal. Per-length failures,
    /// including a length with no batch, are skipped.
    pub fn train(
        &self,
        batches: &WindowedBatches,
    ) -> ForecastResult<(BTreeMap<usize, ScalerModelUnit>, TrainingReport)> {
        let requested: Vec<(usize, &[TrainingExample])> = self
            .config
            .prefix_lengths
            .iter()
            .map(|&days| (days, batches.get(&days).map(Vec::as_slice).unwrap_or(&[])))
            .collect();

        if requested.iter().all(|(_, batch)| batch.is_empty()) {
            return Err(ForecastError::TrainingData(
                "training table contains no series".to_string(),
            ));
        }

        let mut units = BTreeMap::new();
        let mut report = TrainingReport::default();

        for (days, batch) in requested {
            match self.train_length(days, batch) {
                Ok((unit, length_report)) => {
                    info!(
                        days = days,
                        train_examples = length_report.train_examples,
                        test_examples = length_report.test_examples,
                        train_r2 = length_report.train_r2,
                        test_r2 = length_report.test_r2,
                        "Trained model"
                    );
                    if !length_report.converged {
                        warn!(
                            days = days,
                            iterations = length_report.iterations,
                            "Elastic net did not converge within max_iter"
                        );
                    }
                    units.insert(days, unit);
                    report.trained.push(length_report);
                }
                Err(e) => {
                    warn!(days = days, error = %e, "Skipping prefix length");
                    report.skipped.push(SkippedLength {
                        days,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok((units, report))
    }

    /// Train and persist every unit through `store`
    pub fn train_and_save(
        &self,
        batches: &WindowedBatches,
        store: &ModelStore,
    ) -> ForecastResult<TrainingReport> {
        let (units, report) = self.train(batches)?;
        for (days, unit) in &units {
            let test_r2 = report
                .trained
                .iter()
                .find(|r| r.days == *days)
                .map(|r| r.test_r2);
            store.save_scored(*days, unit, test_r2)?;
        }
        Ok(report)
    }

    /// Fit the scaler and model for a single prefix length
    pub fn train_length(
        &self,
        days: usize,
        batch: &[TrainingExample],
    ) -> ForecastResult<(ScalerModelUnit, LengthReport)> {
        if batch.is_empty() {
            return Err(ForecastError::TrainingData(format!(
                "no training examples for {} days",
                days
            )));
        }
        if batch.len() < 2 {
            return Err(ForecastError::TrainingData(format!(
                "need at least 2 examples for {} days to hold out a test split, got {}",
                days,
                batch.len()
            )));
        }
        if let Some(bad) = batch.iter().position(|e| e.days() != days) {
            return Err(ForecastError::TrainingData(format!(
                "example {} has {} prefix values, expected {}",
                bad,
                batch[bad].days(),
                days
            )));
        }

        let (x, y) = to_matrices(batch)?;
        let (train_idx, test_idx) = self.split(batch.len());

        let x_train = x.select(Axis(0), &train_idx);
        let y_train = y.select(Axis(0), &train_idx);
        let x_test = x.select(Axis(0), &test_idx);
        let y_test = y.select(Axis(0), &test_idx);

        let scaler = StandardScaler::fit(x_train.view())?;
        let x_train_scaled = scaler.transform_matrix(x_train.view())?;
        let (model, summary) =
            ElasticNet::fit(x_train_scaled.view(), y_train.view(), &self.config.params)?;

        let train_pred = model.predict_matrix(x_train_scaled.view())?;
        let x_test_scaled = scaler.transform_matrix(x_test.view())?;
        let test_pred = model.predict_matrix(x_test_scaled.view())?;

        let report = LengthReport {
            days,
            train_examples: train_idx.len(),
            test_examples: test_idx.len(),
            train_r2: r2_score(y_train.view(), train_pred.view()),
            test_r2: r2_score(y_test.view(), test_pred.view()),
            iterations: summary.iterations,
            converged: summary.converged,
        };

        let unit = ScalerModelUnit::new(days, scaler, model)?;
        Ok((unit, report))
    }

    /// Seeded shuffle split; both sides keep at least one example
    fn split(&self, n: usize) -> (Vec<usize>, Vec<usize>) {
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        indices.shuffle(&mut rng);

        let n_test = ((n as f64) * self.config.test_size).ceil() as usize;
        let n_test = n_test.clamp(1, n - 1);
        let train = indices.split_off(n_test);
        (train, indices)
    }
}

fn to_matrices(batch: &[TrainingExample]) -> ForecastResult<(Array2<f64>, Array2<f64>)> {
    let days = batch[0].days();
    let rest = batch[0].remainder.len();

    let x = Array2::from_shape_vec(
        (batch.len(), days),
        batch.iter().flat_map(|e| e.prefix.iter().copied()).collect(),
    )
    .map_err(|e| ForecastError::TrainingData(e.to_string()))?;

    if batch.iter().any(|e| e.remainder.len() != rest) {
        return Err(ForecastError::TrainingData(
            "remainders have inconsistent lengths".to_string(),
        ));
    }
    let y = Array2::from_shape_vec(
        (batch.len(), rest),
        batch.iter().flat_map(|e| e.remainder.iter().copied()).collect(),
    )
    .map_err(|e| ForecastError::TrainingData(e.to_string()))?;

    Ok((x, y))
}
