//! On-disk persistence of scaler/model artifacts
//!
//! One JSON artifact per prefix length, named `model_{k}days.json`. An
//! artifact is a versioned envelope around exactly two named components,
//! `scaler` and `model`, plus a SHA-256 checksum of those components and
//! the held-out score recorded at training time.
//! A missing file is a normal outcome; a file that fails any structural
//! check is reported as corrupt.

use crate::error::{ForecastError, ForecastResult};
use crate::models::is_supported_length;
use crate::predictor::unit::check_shape;
use crate::predictor::ScalerModelUnit;
use crate::training::{ElasticNet, StandardScaler};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Artifact layout version written by this build
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

const SCALER_KEY: &str = "scaler";
const MODEL_KEY: &str = "model";

/// Persisted artifact envelope
#[derive(Debug, Serialize, Deserialize)]
struct ArtifactEnvelope {
    format_version: u32,
    prefix_len: usize,
    trained_at: String,
    checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    test_r2: Option<f64>,
    scaler: Value,
    model: Value,
}

/// A decoded artifact with its training metadata
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedArtifact {
    pub unit: ScalerModelUnit,
    /// Held-out R2 from the training run, when one was recorded
    pub test_r2: Option<f64>,
}

/// Metadata about one persisted artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub days: usize,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub checksum: String,
    pub trained_at: String,
    pub test_r2: Option<f64>,
}

/// Directory-backed artifact store
#[derive(Debug, Clone)]
pub struct ModelStore {
    model_dir: PathBuf,
}

impl ModelStore {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Artifact path for prefix length `days`
    pub fn artifact_path(&self, days: usize) -> PathBuf {
        self.model_dir.join(artifact_file_name(days))
    }

    /// Persist `unit` under the key for `days`, replacing any previous artifact
    pub fn save(&self, days: usize, unit: &ScalerModelUnit) -> ForecastResult<PathBuf> {
        self.save_scored(days, unit, None)
    }

    /// Persist `unit` together with its held-out score
    pub fn save_scored(
        &self,
        days: usize,
        unit: &ScalerModelUnit,
        test_r2: Option<f64>,
    ) -> ForecastResult<PathBuf> {
        if unit.days() != days {
            return Err(ForecastError::TrainingData(format!(
                "unit for {} days cannot be saved as {} days",
                unit.days(),
                days
            )));
        }

        fs::create_dir_all(&self.model_dir).map_err(|e| ForecastError::io(&self.model_dir, e))?;

        let scaler = to_value(unit.scaler())?;
        let model = to_value(unit.model())?;
        let envelope = ArtifactEnvelope {
            format_version: ARTIFACT_FORMAT_VERSION,
            prefix_len: days,
            trained_at: chrono::Utc::now().to_rfc3339(),
            checksum: components_checksum(&scaler, &model),
            test_r2: test_r2.filter(|score| score.is_finite()),
            scaler,
            model,
        };
        let bytes = serde_json::to_vec_pretty(&envelope)
            .map_err(|e| ForecastError::TrainingData(format!("failed to encode artifact: {}", e)))?;

        let path = self.artifact_path(days);
        write_atomic(&path, &bytes)?;

        info!(
            days = days,
            path = %path.display(),
            checksum = %envelope.checksum,
            "Saved model artifact"
        );
        Ok(path)
    }

    /// Load the unit for `days`; `Ok(None)` when no artifact exists
    pub fn load(&self, days: usize) -> ForecastResult<Option<ScalerModelUnit>> {
        Ok(self.load_artifact(days)?.map(|artifact| artifact.unit))
    }

    /// Load the unit for `days` along with its recorded score
    pub fn load_artifact(&self, days: usize) -> ForecastResult<Option<LoadedArtifact>> {
        let path = self.artifact_path(days);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(days = days, path = %path.display(), "No model artifact");
                return Ok(None);
            }
            Err(e) => return Err(ForecastError::corrupt(&path, e.to_string())),
        };

        decode_artifact(days, &bytes)
            .map(Some)
            .map_err(|reason| ForecastError::corrupt(&path, reason))
    }

    /// List artifacts present in the model directory, ordered by prefix length
    pub fn list(&self) -> ForecastResult<Vec<ArtifactInfo>> {
        let entries = match fs::read_dir(&self.model_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ForecastError::io(&self.model_dir, e)),
        };

        let mut infos = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ForecastError::io(&self.model_dir, e))?;
            let name = entry.file_name();
            let Some(days) = name.to_str().and_then(parse_artifact_file_name) else {
                continue;
            };

            let path = entry.path();
            let bytes = fs::read(&path).map_err(|e| ForecastError::io(&path, e))?;
            let envelope: ArtifactEnvelope = serde_json::from_slice(&bytes)
                .map_err(|e| ForecastError::corrupt(&path, e.to_string()))?;

            infos.push(ArtifactInfo {
                days,
                path,
                size_bytes: bytes.len() as u64,
                checksum: envelope.checksum,
                trained_at: envelope.trained_at,
                test_r2: envelope.test_r2,
            });
        }

        infos.sort_by_key(|info| info.days);
        Ok(infos)
    }
}

/// File name derived from the prefix length
pub fn artifact_file_name(days: usize) -> String {
    format!("model_{}days.json", days)
}

fn parse_artifact_file_name(name: &str) -> Option<usize> {
    name.strip_prefix("model_")?
        .strip_suffix("days.json")?
        .parse()
        .ok()
        .filter(|days| is_supported_length(*days))
}

fn to_value<T: Serialize>(component: &T) -> ForecastResult<Value> {
    serde_json::to_value(component)
        .map_err(|e| ForecastError::TrainingData(format!("failed to encode component: {}", e)))
}

/// Checksum over the compact encoding of both components
fn components_checksum(scaler: &Value, model: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(SCALER_KEY.as_bytes());
    hasher.update(scaler.to_string().as_bytes());
    hasher.update(MODEL_KEY.as_bytes());
    hasher.update(model.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Decode and verify an artifact, returning the corruption reason on failure
fn decode_artifact(days: usize, bytes: &[u8]) -> Result<LoadedArtifact, String> {
    let document: Value =
        serde_json::from_slice(bytes).map_err(|e| format!("invalid JSON: {}", e))?;
    let object = document
        .as_object()
        .ok_or_else(|| "artifact is not a JSON object".to_string())?;
    for key in [SCALER_KEY, MODEL_KEY] {
        if !object.contains_key(key) {
            return Err(format!("missing '{}' component", key));
        }
    }

    let envelope: ArtifactEnvelope =
        serde_json::from_value(document).map_err(|e| format!("malformed envelope: {}", e))?;

    if envelope.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(format!(
            "unsupported format version {}",
            envelope.format_version
        ));
    }
    if envelope.prefix_len != days {
        return Err(format!(
            "artifact is for {} days, expected {}",
            envelope.prefix_len, days
        ));
    }

    let computed = components_checksum(&envelope.scaler, &envelope.model);
    if computed != envelope.checksum {
        return Err(format!(
            "checksum mismatch: expected {}, got {}",
            envelope.checksum, computed
        ));
    }

    let scaler: StandardScaler = serde_json::from_value(envelope.scaler)
        .map_err(|e| format!("malformed scaler: {}", e))?;
    let model: ElasticNet =
        serde_json::from_value(envelope.model).map_err(|e| format!("malformed model: {}", e))?;

    check_shape(days, &scaler, &model)?;
    let unit = ScalerModelUnit::new(days, scaler, model).map_err(|e| e.to_string())?;
    Ok(LoadedArtifact {
        unit,
        test_r2: envelope.test_r2,
    })
}

/// Write to a temp file, sync, then rename into place
fn write_atomic(path: &Path, bytes: &[u8]) -> ForecastResult<()> {
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path).map_err(|e| ForecastError::io(&temp_path, e))?;
    file.write_all(bytes)
        .map_err(|e| ForecastError::io(&temp_path, e))?;
    file.sync_all().map_err(|e| ForecastError::io(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| ForecastError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::unit::test_support::counting_unit;
    use tempfile::TempDir;

    fn store() -> (TempDir, ModelStore) {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path());
        (dir, store)
    }

    fn rewrite(store: &ModelStore, days: usize, edit: impl FnOnce(&mut Value)) {
        let path = store.artifact_path(days);
        let mut doc: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        edit(&mut doc);
        fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();
    }

    #[test]
    fn test_artifact_file_name() {
        assert_eq!(artifact_file_name(3), "model_3days.json");
        assert_eq!(parse_artifact_file_name("model_3days.json"), Some(3));
        assert_eq!(parse_artifact_file_name("model_9days.json"), None);
        assert_eq!(parse_artifact_file_name("model_3days.tmp"), None);
    }

    #[test]
    fn test_save_then_load() {
        let (_dir, store) = store();
        let unit = counting_unit(4);
        store.save(4, &unit).unwrap();

        let loaded = store.load(4).unwrap().unwrap();
        assert_eq!(loaded, unit);
    }

    #[test]
    fn test_score_round_trips_outside_checksum() {
        let (_dir, store) = store();
        store.save_scored(3, &counting_unit(3), Some(0.93)).unwrap();
        store.save(4, &counting_unit(4)).unwrap();

        let scored = store.load_artifact(3).unwrap().unwrap();
        assert_eq!(scored.test_r2, Some(0.93));
        assert_eq!(scored.unit, counting_unit(3));
        assert_eq!(store.load_artifact(4).unwrap().unwrap().test_r2, None);

        let infos = store.list().unwrap();
        assert_eq!(infos[0].test_r2, Some(0.93));
        assert_eq!(infos[1].test_r2, None);
    }

    #[test]
    fn test_non_finite_score_is_dropped() {
        let (_dir, store) = store();
        store.save_scored(1, &counting_unit(1), Some(f64::NAN)).unwrap();
        assert_eq!(store.load_artifact(1).unwrap().unwrap().test_r2, None);
    }

    #[test]
    fn test_missing_is_not_an_error() {
        let (_dir, store) = store();
        assert!(store.load(2).unwrap().is_none());
    }

    #[test]
    fn test_invalid_json_is_corrupt() {
        let (_dir, store) = store();
        fs::write(store.artifact_path(1), b"not json").unwrap();
        assert!(matches!(
            store.load(1),
            Err(ForecastError::CorruptArtifact { .. })
        ));
    }

    #[test]
    fn test_missing_component_is_corrupt() {
        let (_dir, store) = store();
        store.save(2, &counting_unit(2)).unwrap();
        rewrite(&store, 2, |doc| {
            doc.as_object_mut().unwrap().remove("scaler");
        });
        let err = store.load(2).unwrap_err();
        assert!(err.to_string().contains("missing 'scaler' component"));
    }

    #[test]
    fn test_checksum_mismatch_is_corrupt() {
        let (_dir, store) = store();
        store.save(2, &counting_unit(2)).unwrap();
        rewrite(&store, 2, |doc| {
            doc["model"]["intercepts"][0] = Value::from(99.0);
        });
        let err = store.load(2).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn test_wrong_key_is_corrupt() {
        let (_dir, store) = store();
        store.save(2, &counting_unit(2)).unwrap();
        fs::rename(store.artifact_path(2), store.artifact_path(3)).unwrap();
        let err = store.load(3).unwrap_err();
        assert!(err.to_string().contains("artifact is for 2 days"));
    }

    #[test]
    fn test_unknown_version_is_corrupt() {
        let (_dir, store) = store();
        store.save(1, &counting_unit(1)).unwrap();
        rewrite(&store, 1, |doc| doc["format_version"] = Value::from(99));
        let err = store.load(1).unwrap_err();
        assert!(err.to_string().contains("unsupported format version"));
    }

    #[test]
    fn test_wrong_dimensions_are_corrupt() {
        let (_dir, store) = store();
        store.save(2, &counting_unit(2)).unwrap();
        rewrite(&store, 2, |doc| {
            doc["scaler"]["mean"] = serde_json::json!([0.0, 0.0, 0.0]);
            doc["scaler"]["scale"] = serde_json::json!([1.0, 1.0, 1.0]);
            let checksum = components_checksum(&doc["scaler"], &doc["model"]);
            doc["checksum"] = Value::from(checksum);
        });
        let err = store.load(2).unwrap_err();
        assert!(err.to_string().contains("scaler has 3 features"));
    }

    #[test]
    fn test_save_rejects_mismatched_key() {
        let (_dir, store) = store();
        assert!(store.save(3, &counting_unit(2)).is_err());
    }

    #[test]
    fn test_list() {
        let (dir, store) = store();
        assert!(store.list().unwrap().is_empty());

        store.save(5, &counting_unit(5)).unwrap();
        store.save(1, &counting_unit(1)).unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let infos = store.list().unwrap();
        assert_eq!(infos.iter().map(|i| i.days).collect::<Vec<_>>(), vec![1, 5]);
        assert_eq!(infos[0].checksum.len(), 64);
        assert!(infos[0].size_bytes > 0);
    }

    #[test]
    fn test_missing_directory_lists_nothing() {
        let store = ModelStore::new("/nonexistent/daycast/models");
        assert!(store.list().unwrap().is_empty());
        assert!(store.load(1).unwrap().is_none());
    }
}
