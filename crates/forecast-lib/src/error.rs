//! Error taxonomy for validation, training, persistence and prediction

use std::path::PathBuf;
use thiserror::Error;

/// Message returned to callers for faults that must not leak detail
pub const GENERIC_INTERNAL_MESSAGE: &str = "internal prediction error";

/// Reasons a raw input is rejected before reaching the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no data provided")]
    NoData,

    #[error("values must be non-negative numbers")]
    InvalidValue,

    #[error("at least one day of data is required")]
    NoDays,
}

/// Errors surfaced by the forecasting core
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("no model for {0} days")]
    UnsupportedLength(usize),

    #[error("corrupt model artifact {path:?}: {reason}")]
    CorruptArtifact { path: PathBuf, reason: String },

    #[error("prediction failed: {0}")]
    Prediction(String),

    #[error("training data error: {0}")]
    TrainingData(String),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias used throughout the crate
pub type ForecastResult<T> = Result<T, ForecastError>;

impl ForecastError {
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptArtifact {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Caller-caused errors are reported verbatim; everything else is a fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::UnsupportedLength(_))
    }

    /// Message safe to return to an external caller
    pub fn public_message(&self) -> String {
        if self.is_client_error() {
            self.to_string()
        } else {
            GENERIC_INTERNAL_MESSAGE.to_string()
        }
    }

    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::UnsupportedLength(_) => "unsupported_length",
            Self::CorruptArtifact { .. } => "corrupt_artifact",
            Self::Prediction(_) => "prediction",
            Self::TrainingData(_) => "training_data",
            Self::Io { .. } => "io",
        }
    }
}
