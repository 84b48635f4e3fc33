//! State store errors.

use thiserror::Error;
use viirs_common::ViirsError;

pub type Result<T> = std::result::Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be decoded (bad timestamp, bad date).
    #[error("Corrupt state record in {table}: {reason}")]
    Corrupt { table: &'static str, reason: String },
}

impl StateError {
    pub(crate) fn corrupt(table: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Corrupt {
            table,
            reason: reason.to_string(),
        }
    }
}

impl From<StateError> for ViirsError {
    fn from(err: StateError) -> Self {
        ViirsError::State(err.to_string())
    }
}
