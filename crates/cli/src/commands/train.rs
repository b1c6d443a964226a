//! `daycast train`: fit and persist one model per prefix length

use anyhow::{Context, Result};
use forecast_lib::{
    observability::StructuredLogger,
    training::{
        dataset, window_all, window_tables, ElasticNetParams, Trainer, TrainingConfig,
        TrainingReport, WindowedBatches,
    },
    ModelStore, MAX_PREFIX_DAYS, SERIES_LEN, SUPPORTED_PREFIX_LENGTHS,
};
use tabled::Tabled;

use crate::output::{color_score, print_json, print_success, print_table, print_warning, OutputFormat};
use crate::TrainArgs;

/// Row for the training report table
#[derive(Tabled)]
struct TrainedRow {
    #[tabled(rename = "Days")]
    days: usize,
    #[tabled(rename = "Train")]
    train_examples: usize,
    #[tabled(rename = "Test")]
    test_examples: usize,
    #[tabled(rename = "Train R²")]
    train_r2: String,
    #[tabled(rename = "Test R²")]
    test_r2: String,
    #[tabled(rename = "Iterations")]
    iterations: String,
}

fn training_config(args: &TrainArgs) -> TrainingConfig {
    let prefix_lengths = if args.days.is_empty() {
        SUPPORTED_PREFIX_LENGTHS.collect()
    } else {
        args.days.clone()
    };

    TrainingConfig {
        params: ElasticNetParams {
            alpha: args.alpha,
            l1_ratio: args.l1_ratio,
            max_iter: args.max_iter,
            ..ElasticNetParams::default()
        },
        test_size: args.test_size,
        seed: args.seed,
        prefix_lengths,
    }
}

/// Read the training tables named on the command line and window them
fn load_batches(args: &TrainArgs, lengths: &[usize]) -> Result<WindowedBatches> {
    match (&args.series, &args.prefix, &args.target) {
        (Some(series_path), _, _) => {
            let series = dataset::load_series(series_path)
                .with_context(|| format!("Failed to read {}", series_path.display()))?;
            Ok(window_all(&series, lengths)?)
        }
        (None, Some(prefix_path), Some(target_path)) => {
            let prefixes = dataset::load_table(prefix_path, MAX_PREFIX_DAYS)
                .with_context(|| format!("Failed to read {}", prefix_path.display()))?;
            let targets = dataset::load_table(target_path, SERIES_LEN)
                .with_context(|| format!("Failed to read {}", target_path.display()))?;
            Ok(window_tables(&prefixes, &targets, lengths)?)
        }
        _ => anyhow::bail!("either --series or both --prefix and --target are required"),
    }
}

/// Train, save and report
pub fn run_training(args: &TrainArgs, format: OutputFormat) -> Result<()> {
    let config = training_config(args);
    let batches = load_batches(args, &config.prefix_lengths)?;
    let trainer = Trainer::new(config)?;
    let store = ModelStore::new(&args.model_dir);

    let report = trainer
        .train_and_save(&batches, &store)
        .context("Training failed")?;

    let logger = StructuredLogger::new("daycast-cli");
    for trained in &report.trained {
        logger.log_model_trained(
            trained.days,
            trained.train_r2,
            trained.test_r2,
            &store.artifact_path(trained.days).display().to_string(),
        );
    }

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report, &store),
    }

    if report.trained.is_empty() {
        anyhow::bail!("no prefix length could be trained");
    }
    Ok(())
}

fn print_report(report: &TrainingReport, store: &ModelStore) {
    if !report.trained.is_empty() {
        let rows: Vec<TrainedRow> = report
            .trained
            .iter()
            .map(|r| TrainedRow {
                days: r.days,
                train_examples: r.train_examples,
                test_examples: r.test_examples,
                train_r2: color_score(r.train_r2),
                test_r2: color_score(r.test_r2),
                iterations: if r.converged {
                    r.iterations.to_string()
                } else {
                    format!("{} (not converged)", r.iterations)
                },
            })
            .collect();
        print_table(rows);
        print_success(&format!(
            "Saved {} model(s) to {}",
            report.trained.len(),
            store.model_dir().display()
        ));
    }

    for skipped in &report.skipped {
        print_warning(&format!("Skipped {} days: {}", skipped.days, skipped.reason));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::{NamedTempFile, TempDir};

    fn args(series: PathBuf, model_dir: PathBuf) -> TrainArgs {
        TrainArgs {
            series: Some(series),
            prefix: None,
            target: None,
            model_dir,
            days: vec![1, 2],
            alpha: 0.1,
            l1_ratio: 0.5,
            max_iter: 10_000,
            test_size: 0.2,
            seed: 30,
        }
    }

    fn series_csv(rows: usize) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        let header: Vec<String> = (1..=SERIES_LEN).map(|d| format!("day{}", d)).collect();
        writeln!(file, "{}", header.join(",")).unwrap();
        for start in 0..rows {
            let row: Vec<String> = (0..SERIES_LEN)
                .map(|d| (start + d * (1 + start % 3)).to_string())
                .collect();
            writeln!(file, "{}", row.join(",")).unwrap();
        }
        file
    }

    #[test]
    fn test_default_lengths() {
        let mut a = args(PathBuf::from("s.csv"), PathBuf::from("m"));
        a.days.clear();
        assert_eq!(training_config(&a).prefix_lengths, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_run_training_writes_artifacts() {
        let csv = series_csv(40);
        let dir = TempDir::new().unwrap();
        let a = args(csv.path().to_path_buf(), dir.path().to_path_buf());

        run_training(&a, OutputFormat::Json).unwrap();

        let store = ModelStore::new(dir.path());
        assert!(store.artifact_path(1).exists());
        assert!(store.artifact_path(2).exists());
        assert!(!store.artifact_path(3).exists());
    }

    #[test]
    fn test_run_training_rejects_empty_table() {
        let csv = series_csv(0);
        let dir = TempDir::new().unwrap();
        let a = args(csv.path().to_path_buf(), dir.path().to_path_buf());

        assert!(run_training(&a, OutputFormat::Json).is_err());
    }
}
