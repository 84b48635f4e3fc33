//! Error types for the VIIRS pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using ViirsError.
pub type Result<T> = std::result::Result<T, ViirsError>;

/// Primary error type for swath processing.
#[derive(Debug, Error)]
pub enum ViirsError {
    // === Input Errors ===
    #[error("Invalid swath filename '{name}': {reason}")]
    Parse { name: String, reason: String },

    #[error("Sub-dataset '{dataset}' not found in {}", file.display())]
    SubDatasetNotFound { file: PathBuf, dataset: String },

    #[error("Input not available yet: {0}")]
    DeferredInput(String),

    // === Processing Errors ===
    #[error("Projection failed: {0}")]
    ProjectionFailure(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    // === State Errors ===
    #[error("State record points at missing file: {}", .0.display())]
    StateInconsistency(PathBuf),

    #[error("State store error: {0}")]
    State(String),

    // === Infrastructure Errors ===
    #[error("Raster I/O error: {0}")]
    Raster(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ViirsError {
    pub fn parse(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn sub_dataset(file: impl Into<PathBuf>, dataset: impl Into<String>) -> Self {
        Self::SubDatasetNotFound {
            file: file.into(),
            dataset: dataset.into(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    pub fn projection(msg: impl Into<String>) -> Self {
        Self::ProjectionFailure(msg.into())
    }

    pub fn raster(msg: impl std::fmt::Display) -> Self {
        Self::Raster(msg.to_string())
    }

    /// Short stable label, used for metrics and run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "parse",
            Self::SubDatasetNotFound { .. } => "sub_dataset_not_found",
            Self::DeferredInput(_) => "deferred_input",
            Self::ProjectionFailure(_) => "projection_failure",
            Self::InvalidData(_) => "invalid_data",
            Self::StateInconsistency(_) => "state_inconsistency",
            Self::State(_) => "state",
            Self::Raster(_) => "raster",
            Self::Io(_) => "io",
        }
    }

    /// Deferred inputs are retried on a later run instead of counting as failures.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::DeferredInput(_))
    }
}

impl From<serde_json::Error> for ViirsError {
    fn from(err: serde_json::Error) -> Self {
        ViirsError::Raster(format!("JSON error: {}", err))
    }
}
