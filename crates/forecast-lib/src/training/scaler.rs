//! Standard (z-score) feature scaler

use crate::error::{ForecastError, ForecastResult};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Per-feature standardization fitted on training prefixes.
///
/// A zero-variance feature keeps a scale of 1.0 so it maps to 0 instead of
/// dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on a (samples x features) matrix.
    ///
    /// Fails when there are no samples or every feature is constant.
    pub fn fit(x: ArrayView2<f64>) -> ForecastResult<Self> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(ForecastError::TrainingData(
                "cannot fit scaler on an empty batch".to_string(),
            ));
        }

        let mean: Array1<f64> = x
            .mean_axis(Axis(0))
            .ok_or_else(|| ForecastError::TrainingData("empty batch".to_string()))?;
        let std = x.std_axis(Axis(0), 0.0);

        if std.iter().all(|s| *s <= f64::EPSILON) {
            return Err(ForecastError::TrainingData(
                "all prefix features have zero variance".to_string(),
            ));
        }

        let scale = std
            .iter()
            .map(|&s| if s <= f64::EPSILON { 1.0 } else { s })
            .collect();

        Ok(Self {
            mean: mean.to_vec(),
            scale,
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Scale one feature vector; a length mismatch is an invariant violation
    pub fn transform(&self, features: &[f64]) -> ForecastResult<Vec<f64>> {
        if features.len() != self.n_features() {
            return Err(ForecastError::Prediction(format!(
                "scaler expects {} features, got {}",
                self.n_features(),
                features.len()
            )));
        }
        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    /// Scale every row of a matrix
    pub fn transform_matrix(&self, x: ArrayView2<f64>) -> ForecastResult<Array2<f64>> {
        if x.ncols() != self.n_features() {
            return Err(ForecastError::Prediction(format!(
                "scaler expects {} features, got {}",
                self.n_features(),
                x.ncols()
            )));
        }
        let mean = Array1::from(self.mean.clone());
        let scale = Array1::from(self.scale.clone());
        Ok((&x - &mean) / &scale)
    }

    /// Structural check used when loading artifacts
    pub fn is_consistent(&self) -> bool {
        self.mean.len() == self.scale.len()
            && self
                .mean
                .iter()
                .chain(&self.scale)
                .all(|v| v.is_finite())
            && self.scale.iter().all(|s| *s > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_and_transform() {
        let x = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
        let scaler = StandardScaler::fit(x.view()).unwrap();
        assert_eq!(scaler.mean, vec![3.0, 10.0]);
        // Constant second feature keeps unit scale
        assert_eq!(scaler.scale[1], 1.0);

        let scaled = scaler.transform(&[3.0, 10.0]).unwrap();
        assert!(scaled.iter().all(|v| v.abs() < 1e-12));

        let scaled = scaler.transform(&[5.0, 12.0]).unwrap();
        assert!((scaled[0] - 2.0 / (8.0f64 / 3.0).sqrt()).abs() < 1e-9);
        assert!((scaled[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_all_constant_features_rejected() {
        let x = array![[2.0, 4.0], [2.0, 4.0]];
        assert!(matches!(
            StandardScaler::fit(x.view()),
            Err(ForecastError::TrainingData(_))
        ));
    }

    #[test]
    fn test_empty_batch_rejected() {
        let x = Array2::<f64>::zeros((0, 3));
        assert!(StandardScaler::fit(x.view()).is_err());
    }

    #[test]
    fn test_dimension_mismatch_is_prediction_error() {
        let scaler = StandardScaler {
            mean: vec![0.0, 0.0, 0.0],
            scale: vec![1.0, 1.0, 1.0],
        };
        assert!(matches!(
            scaler.transform(&[1.0, 2.0]),
            Err(ForecastError::Prediction(_))
        ));
    }

    #[test]
    fn test_matrix_transform_matches_rows() {
        let x = array![[1.0, 2.0], [3.0, 6.0], [5.0, 1.0]];
        let scaler = StandardScaler::fit(x.view()).unwrap();
        let scaled = scaler.transform_matrix(x.view()).unwrap();
        for (row, scaled_row) in x.rows().into_iter().zip(scaled.rows()) {
            let single = scaler.transform(&row.to_vec()).unwrap();
            for (a, b) in single.iter().zip(scaled_row.iter()) {
                assert!((a - b).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_consistency_check() {
        let mut scaler = StandardScaler {
            mean: vec![0.0],
            scale: vec![1.0],
        };
        assert!(scaler.is_consistent());
        scaler.scale = vec![0.0];
        assert!(!scaler.is_consistent());
        scaler.scale = vec![1.0, 1.0];
        assert!(!scaler.is_consistent());
    }
}
