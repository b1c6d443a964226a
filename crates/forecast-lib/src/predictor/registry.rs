//! Read-only mapping from prefix length to trained unit

use super::unit::ScalerModelUnit;
use crate::error::ForecastResult;
use crate::models::SUPPORTED_PREFIX_LENGTHS;
use crate::observability::ForecastMetrics;
use crate::store::ModelStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Registry of units keyed by prefix length.
///
/// Built once and then shared immutably; a missing key means the prefix
/// length is not supported.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    units: BTreeMap<usize, Arc<ScalerModelUnit>>,
    test_scores: BTreeMap<usize, f64>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from in-memory units
    pub fn from_units(units: impl IntoIterator<Item = ScalerModelUnit>) -> Self {
        let mut registry = Self::new();
        for unit in units {
            registry.insert(unit);
        }
        registry
    }

    /// Load every supported prefix length from `store`.
    ///
    /// Missing artifacts leave their key absent. A corrupt artifact fails
    /// the whole load so a bad deployment is caught at startup. Recorded
    /// held-out scores are exported through the test R2 gauge.
    pub fn load(store: &ModelStore) -> ForecastResult<Self> {
        let metrics = ForecastMetrics::new();
        let mut registry = Self::new();
        for days in SUPPORTED_PREFIX_LENGTHS {
            match store.load_artifact(days)? {
                Some(artifact) => {
                    if let Some(score) = artifact.test_r2 {
                        metrics.set_model_test_r2(days, score);
                        registry.test_scores.insert(days, score);
                    }
                    registry.insert(artifact.unit);
                }
                None => warn!(
                    days = days,
                    path = %store.artifact_path(days).display(),
                    "No model artifact, prefix length will be rejected"
                ),
            }
        }
        info!(
            loaded = ?registry.loaded_lengths(),
            model_dir = %store.model_dir().display(),
            "Model registry loaded"
        );
        Ok(registry)
    }

    /// Insert or replace the unit for its prefix length
    pub fn insert(&mut self, unit: ScalerModelUnit) {
        self.units.insert(unit.days(), Arc::new(unit));
    }

    pub fn get(&self, days: usize) -> Option<&ScalerModelUnit> {
        self.units.get(&days).map(Arc::as_ref)
    }

    /// Held-out R2 recorded when the unit for `days` was trained
    pub fn test_r2(&self, days: usize) -> Option<f64> {
        self.test_scores.get(&days).copied()
    }

    pub fn contains(&self, days: usize) -> bool {
        self.units.contains_key(&days)
    }

    /// Prefix lengths with a loaded unit, ascending
    pub fn loaded_lengths(&self) -> Vec<usize> {
        self.units.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
