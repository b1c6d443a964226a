//! daycast CLI
//!
//! Trains per-length forecast models from CSV tables, lists persisted
//! artifacts and requests forecasts locally or from a running server.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{models, predict, train};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// daycast CLI
#[derive(Parser)]
#[command(name = "daycast")]
#[command(author, version, about = "Train and query 30-day forecast models", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train one model per prefix length and write the artifacts
    Train(TrainArgs),

    /// List persisted model artifacts
    Models {
        /// Directory holding model artifacts
        #[arg(long, env = "DAYCAST_MODEL_DIR", default_value = "model")]
        model_dir: PathBuf,
    },

    /// Forecast the 30-day timeline from the first days
    Predict(PredictArgs),
}

#[derive(Args)]
pub struct TrainArgs {
    /// CSV of full 30-day series, one row per series
    #[arg(long, conflicts_with_all = ["prefix", "target"], required_unless_present_all = ["prefix", "target"])]
    pub series: Option<PathBuf>,

    /// CSV of the first 7 days of each series
    #[arg(long, requires = "target")]
    pub prefix: Option<PathBuf>,

    /// CSV of the full 30 days of each series, row-aligned with --prefix
    #[arg(long, requires = "prefix")]
    pub target: Option<PathBuf>,

    /// Directory to write model artifacts into
    #[arg(long, env = "DAYCAST_MODEL_DIR", default_value = "model")]
    pub model_dir: PathBuf,

    /// Prefix lengths to train (defaults to 1 through 7)
    #[arg(long, value_delimiter = ',')]
    pub days: Vec<usize>,

    /// Overall regularization strength
    #[arg(long, default_value_t = 0.1)]
    pub alpha: f64,

    /// Share of L1 in the penalty (0 = ridge, 1 = lasso)
    #[arg(long, default_value_t = 0.5)]
    pub l1_ratio: f64,

    /// Coordinate descent iteration cap
    #[arg(long, default_value_t = 10_000)]
    pub max_iter: usize,

    /// Fraction of series held out for the test score
    #[arg(long, default_value_t = forecast_lib::training::DEFAULT_TEST_SIZE)]
    pub test_size: f64,

    /// Seed for the train/test shuffle
    #[arg(long, default_value_t = forecast_lib::training::DEFAULT_SEED)]
    pub seed: u64,
}

#[derive(Args)]
pub struct PredictArgs {
    #[arg(long)]
    pub day1: Option<f64>,
    #[arg(long)]
    pub day2: Option<f64>,
    #[arg(long)]
    pub day3: Option<f64>,
    #[arg(long)]
    pub day4: Option<f64>,
    #[arg(long)]
    pub day5: Option<f64>,
    #[arg(long)]
    pub day6: Option<f64>,
    #[arg(long)]
    pub day7: Option<f64>,

    /// Evaluate the artifacts in --model-dir instead of calling the server
    #[arg(long)]
    pub local: bool,

    /// Directory holding model artifacts (with --local)
    #[arg(long, env = "DAYCAST_MODEL_DIR", default_value = "model")]
    pub model_dir: PathBuf,

    /// Server URL
    #[arg(long, env = "DAYCAST_API_URL", default_value = "http://localhost:5000")]
    pub api_url: String,
}

impl PredictArgs {
    /// Day values in slot order, gaps preserved
    pub fn days(&self) -> [Option<f64>; 7] {
        [
            self.day1, self.day2, self.day3, self.day4, self.day5, self.day6, self.day7,
        ]
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Train(args) => {
            train::run_training(&args, cli.format)?;
        }
        Commands::Models { model_dir } => {
            models::list_models(&model_dir, cli.format)?;
        }
        Commands::Predict(args) => {
            predict::run_prediction(&args, cli.format).await?;
        }
    }

    Ok(())
}
