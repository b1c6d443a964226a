//! `daycast models`: list persisted artifacts

use anyhow::{Context, Result};
use forecast_lib::{ModelStore, SUPPORTED_PREFIX_LENGTHS};
use std::path::Path;
use tabled::Tabled;

use crate::output::{
    color_score, format_bytes, print_info, print_json, print_table, print_warning, OutputFormat,
};

/// Row for models table
#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "Days")]
    days: usize,
    #[tabled(rename = "Trained")]
    trained_at: String,
    #[tabled(rename = "Test R²")]
    test_r2: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Checksum")]
    checksum: String,
    #[tabled(rename = "Path")]
    path: String,
}

/// List artifacts in `model_dir`
pub fn list_models(model_dir: &Path, format: OutputFormat) -> Result<()> {
    let store = ModelStore::new(model_dir);
    let artifacts = store
        .list()
        .with_context(|| format!("Failed to list models in {}", model_dir.display()))?;

    match format {
        OutputFormat::Json => print_json(&artifacts)?,
        OutputFormat::Table => {
            if artifacts.is_empty() {
                print_warning(&format!("No models found in {}", model_dir.display()));
                return Ok(());
            }

            let rows: Vec<ModelRow> = artifacts
                .iter()
                .map(|a| ModelRow {
                    days: a.days,
                    trained_at: a.trained_at.clone(),
                    test_r2: a.test_r2.map(color_score).unwrap_or_else(|| "-".to_string()),
                    size: format_bytes(a.size_bytes),
                    checksum: a.checksum.chars().take(12).collect(),
                    path: a.path.display().to_string(),
                })
                .collect();
            print_table(rows);

            let missing: Vec<String> = SUPPORTED_PREFIX_LENGTHS
                .filter(|days| !artifacts.iter().any(|a| a.days == *days))
                .map(|days| days.to_string())
                .collect();
            if !missing.is_empty() {
                print_info(&format!("No model for days: {}", missing.join(", ")));
            }
        }
    }

    Ok(())
}
