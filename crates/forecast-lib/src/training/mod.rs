//! Offline training: windowing, scaling, elastic-net fitting

pub mod dataset;
mod elastic_net;
mod scaler;
mod trainer;
pub mod windower;

pub use elastic_net::{r2_score, ElasticNet, ElasticNetParams, FitSummary};
pub use scaler::StandardScaler;
pub use trainer::{
    LengthReport, SkippedLength, Trainer, TrainingConfig, TrainingReport, DEFAULT_SEED,
    DEFAULT_TEST_SIZE,
};
pub use windower::{window, window_all, window_tables, WindowedBatches};
