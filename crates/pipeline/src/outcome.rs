//! Step results as data.

use viirs_common::{Result, ViirsError};

/// What one pipeline step did.
#[derive(Debug)]
pub enum Outcome<T> {
    Produced(T),
    /// An input is not available yet; try again on a later run.
    Deferred(String),
    Failed(ViirsError),
}

impl<T> Outcome<T> {
    /// `DeferredInput` errors become `Deferred`, every other error `Failed`.
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => Outcome::Produced(value),
            Err(ViirsError::DeferredInput(reason)) => Outcome::Deferred(reason),
            Err(e) => Outcome::Failed(e),
        }
    }

    pub fn is_produced(&self) -> bool {
        matches!(self, Outcome::Produced(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn produced(&self) -> Option<&T> {
        match self {
            Outcome::Produced(v) => Some(v),
            _ => None,
        }
    }
}
