//! Error types for the risk fusion engine

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the engine and its collaborators.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input that the engine refuses to coerce (wrong feature dimensionality,
    /// unknown location, out-of-range field).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Ledger could not be read, failed verification, or could not be written.
    #[error("ledger persistence failure at {}: {reason}", path.display())]
    Persistence { path: PathBuf, reason: String },

    /// Classifier or novelty detector could not be built.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
}

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Persistence {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Fatal errors must stop the process: serving on a corrupt ledger or a
    /// partial model set is never allowed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Persistence { .. } | Self::ModelUnavailable(_))
    }
}
