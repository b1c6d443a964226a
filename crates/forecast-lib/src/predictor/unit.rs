//! Paired scaler and model for one prefix length

use crate::error::{ForecastError, ForecastResult};
use crate::models::remainder_len;
use crate::training::{ElasticNet, StandardScaler};
use serde::{Deserialize, Serialize};

/// Immutable {scaler, model} pair serving prefixes of exactly `days` points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerModelUnit {
    days: usize,
    scaler: StandardScaler,
    model: ElasticNet,
}

impl ScalerModelUnit {
    /// Pair a scaler and a model, checking that the shapes fit `days`
    pub fn new(days: usize, scaler: StandardScaler, model: ElasticNet) -> ForecastResult<Self> {
        check_shape(days, &scaler, &model).map_err(ForecastError::Prediction)?;
        Ok(Self {
            days,
            scaler,
            model,
        })
    }

    pub fn days(&self) -> usize {
        self.days
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn model(&self) -> &ElasticNet {
        &self.model
    }

    /// Scale `prefix` and evaluate the model, yielding `30 - days` raw values
    pub fn predict_remainder(&self, prefix: &[f64]) -> ForecastResult<Vec<f64>> {
        if prefix.len() != self.days {
            return Err(ForecastError::Prediction(format!(
                "unit for {} days received {} values",
                self.days,
                prefix.len()
            )));
        }

        let scaled = self.scaler.transform(prefix)?;
        let remainder = self.model.predict(&scaled)?;

        if remainder.len() != remainder_len(self.days) {
            return Err(ForecastError::Prediction(format!(
                "model produced {} values, expected {}",
                remainder.len(),
                remainder_len(self.days)
            )));
        }
        if remainder.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::Prediction(
                "model produced a non-finite value".to_string(),
            ));
        }

        Ok(remainder)
    }
}

/// Shape contract shared by construction and artifact loading
pub(crate) fn check_shape(
    days: usize,
    scaler: &StandardScaler,
    model: &ElasticNet,
) -> Result<(), String> {
    if !scaler.is_consistent() {
        return Err("scaler parameters are inconsistent".to_string());
    }
    if !model.is_consistent() {
        return Err("model parameters are inconsistent".to_string());
    }
    if scaler.n_features() != days {
        return Err(format!(
            "scaler has {} features, expected {}",
            scaler.n_features(),
            days
        ));
    }
    if model.n_features() != days {
        return Err(format!(
            "model has {} features, expected {}",
            model.n_features(),
            days
        ));
    }
    if model.n_targets() != remainder_len(days) {
        return Err(format!(
            "model has {} outputs, expected {}",
            model.n_targets(),
            remainder_len(days)
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Unit whose prediction continues the prefix by +1 per day from the last value.
    ///
    /// With an identity scaler, output j = last + (j + 1).
    pub fn counting_unit(days: usize) -> ScalerModelUnit {
        let scaler = StandardScaler {
            mean: vec![0.0; days],
            scale: vec![1.0; days],
        };
        let coefficients = (0..remainder_len(days))
            .map(|_| {
                let mut w = vec![0.0; days];
                w[days - 1] = 1.0;
                w
            })
            .collect();
        let intercepts = (0..remainder_len(days)).map(|j| (j + 1) as f64).collect();
        ScalerModelUnit::new(
            days,
            scaler,
            ElasticNet {
                coefficients,
                intercepts,
            },
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::counting_unit;
    use super::*;

    #[test]
    fn test_shape_checked_on_construction() {
        let scaler = StandardScaler {
            mean: vec![0.0; 2],
            scale: vec![1.0; 2],
        };
        let model = ElasticNet {
            coefficients: vec![vec![0.0; 2]; 27],
            intercepts: vec![0.0; 27],
        };
        // 2 days need 28 outputs
        assert!(ScalerModelUnit::new(2, scaler, model).is_err());
    }

    #[test]
    fn test_predict_remainder() {
        let unit = counting_unit(3);
        let remainder = unit.predict_remainder(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(remainder.len(), 27);
        assert_eq!(remainder[0], 4.0);
        assert_eq!(remainder[26], 30.0);
    }

    #[test]
    fn test_wrong_prefix_length() {
        let unit = counting_unit(3);
        assert!(matches!(
            unit.predict_remainder(&[1.0, 2.0]),
            Err(ForecastError::Prediction(_))
        ));
    }
}
