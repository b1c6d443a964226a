//! Multi-output elastic-net regression fitted by coordinate descent
//!
//! Each output column is fitted independently with the objective
//!
//! ```text
//! 1/(2n) * ||y - Xw - b||^2 + alpha * l1_ratio * ||w||_1
//!     + 0.5 * alpha * (1 - l1_ratio) * ||w||^2
//! ```
//!
//! The intercept is recovered from the column means, so `X` and `y` are
//! centered before descent.

use crate::error::{ForecastError, ForecastResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hyper-parameters for [`ElasticNet::fit`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElasticNetParams {
    pub alpha: f64,
    pub l1_ratio: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for ElasticNetParams {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            l1_ratio: 0.5,
            max_iter: 10_000,
            tol: 1e-4,
        }
    }
}

impl ElasticNetParams {
    pub fn validate(&self) -> ForecastResult<()> {
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(ForecastError::TrainingData(format!(
                "alpha must be non-negative, got {}",
                self.alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.l1_ratio) {
            return Err(ForecastError::TrainingData(format!(
                "l1_ratio must be within [0, 1], got {}",
                self.l1_ratio
            )));
        }
        if self.max_iter == 0 {
            return Err(ForecastError::TrainingData(
                "max_iter must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fitted linear model mapping `n_features` inputs to `n_targets` outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticNet {
    /// One row of `n_features` coefficients per output
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

/// Convergence details reported by the fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitSummary {
    /// Largest iteration count over all outputs
    pub iterations: usize,
    pub converged: bool,
}

impl ElasticNet {
    pub fn fit(
        x: ArrayView2<f64>,
        y: ArrayView2<f64>,
        params: &ElasticNetParams,
    ) -> ForecastResult<(Self, FitSummary)> {
        params.validate()?;

        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(ForecastError::TrainingData(
                "cannot fit model on an empty batch".to_string(),
            ));
        }
        if y.nrows() != n_samples {
            return Err(ForecastError::TrainingData(format!(
                "{} feature rows but {} target rows",
                n_samples,
                y.nrows()
            )));
        }

        let n = n_samples as f64;
        let x_mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));
        let y_mean = y.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(y.ncols()));
        let xc = &x - &x_mean;
        let yc = &y - &y_mean;

        let l1 = params.alpha * params.l1_ratio;
        let l2 = params.alpha * (1.0 - params.l1_ratio);
        let col_sq: Vec<f64> = xc
            .axis_iter(Axis(1))
            .map(|col| col.dot(&col) / n)
            .collect();

        let mut coefficients = Vec::with_capacity(y.ncols());
        let mut intercepts = Vec::with_capacity(y.ncols());
        let mut summary = FitSummary {
            iterations: 0,
            converged: true,
        };

        for (target_idx, target) in yc.axis_iter(Axis(1)).enumerate() {
            let (w, iterations, converged) = descend(xc.view(), target, &col_sq, l1, l2, params);
            summary.iterations = summary.iterations.max(iterations);
            summary.converged &= converged;

            let intercept = y_mean[target_idx] - x_mean.dot(&w);
            coefficients.push(w.to_vec());
            intercepts.push(intercept);
        }

        debug!(
            samples = n_samples,
            features = x.ncols(),
            targets = y.ncols(),
            iterations = summary.iterations,
            converged = summary.converged,
            "Elastic net fitted"
        );

        Ok((
            Self {
                coefficients,
                intercepts,
            },
            summary,
        ))
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.first().map(Vec::len).unwrap_or(0)
    }

    pub fn n_targets(&self) -> usize {
        self.intercepts.len()
    }

    /// Evaluate the model on one feature vector
    pub fn predict(&self, features: &[f64]) -> ForecastResult<Vec<f64>> {
        if features.len() != self.n_features() {
            return Err(ForecastError::Prediction(format!(
                "model expects {} features, got {}",
                self.n_features(),
                features.len()
            )));
        }
        Ok(self
            .coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(w, b)| b + w.iter().zip(features).map(|(w, x)| w * x).sum::<f64>())
            .collect())
    }

    /// Evaluate the model on every row of a matrix
    pub fn predict_matrix(&self, x: ArrayView2<f64>) -> ForecastResult<Array2<f64>> {
        let mut out = Array2::zeros((x.nrows(), self.n_targets()));
        for (row, mut out_row) in x.rows().into_iter().zip(out.rows_mut()) {
            let predicted = self.predict(&row.to_vec())?;
            out_row.assign(&ArrayView1::from(&predicted));
        }
        Ok(out)
    }

    /// Structural check used when loading artifacts
    pub fn is_consistent(&self) -> bool {
        let width = self.n_features();
        self.coefficients.len() == self.intercepts.len()
            && !self.intercepts.is_empty()
            && self.coefficients.iter().all(|w| w.len() == width)
            && self
                .coefficients
                .iter()
                .flatten()
                .chain(&self.intercepts)
                .all(|v| v.is_finite())
    }
}

/// Cyclic coordinate descent for one centered target column
fn descend(
    xc: ArrayView2<f64>,
    target: ArrayView1<f64>,
    col_sq: &[f64],
    l1: f64,
    l2: f64,
    params: &ElasticNetParams,
) -> (Array1<f64>, usize, bool) {
    let n = xc.nrows() as f64;
    let n_features = xc.ncols();
    let mut w = Array1::<f64>::zeros(n_features);
    let mut residual = target.to_owned();

    for iteration in 1..=params.max_iter {
        let mut max_delta = 0.0f64;
        let mut max_w = 0.0f64;

        for j in 0..n_features {
            let denom = col_sq[j] + l2;
            if denom <= 0.0 {
                continue;
            }
            let column = xc.column(j);
            let old = w[j];
            let rho = column.dot(&residual) / n + col_sq[j] * old;
            let new = soft_threshold(rho, l1) / denom;

            if new != old {
                residual.scaled_add(old - new, &column);
                w[j] = new;
            }
            max_delta = max_delta.max((new - old).abs());
            max_w = max_w.max(new.abs());
        }

        if max_w == 0.0 || max_delta / max_w < params.tol {
            return (w, iteration, true);
        }
    }

    (w, params.max_iter, false)
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

/// Coefficient of determination averaged uniformly over outputs.
///
/// An output whose truth has zero variance scores 1.0 when predicted
/// exactly and 0.0 otherwise.
pub fn r2_score(truth: ArrayView2<f64>, predicted: ArrayView2<f64>) -> f64 {
    if truth.ncols() == 0 || truth.nrows() == 0 {
        return 0.0;
    }
    let scores: Vec<f64> = truth
        .axis_iter(Axis(1))
        .zip(predicted.axis_iter(Axis(1)))
        .map(|(t, p)| {
            let mean = t.mean().unwrap_or(0.0);
            let ss_res: f64 = t.iter().zip(p.iter()).map(|(a, b)| (a - b).powi(2)).sum();
            let ss_tot: f64 = t.iter().map(|a| (a - mean).powi(2)).sum();
            if ss_tot <= f64::EPSILON {
                if ss_res <= f64::EPSILON {
                    1.0
                } else {
                    0.0
                }
            } else {
                1.0 - ss_res / ss_tot
            }
        })
        .collect();
    scores.iter().sum::<f64>() / scores.len() as f64
}
