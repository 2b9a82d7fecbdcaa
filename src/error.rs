use std::path::{Path, PathBuf};

use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Everything that can go wrong while opening or reading a suite2p dataset.
#[derive(Debug, Error)]
pub enum S2pError {
    /// The root directory or the pipeline output subfolder does not exist.
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// A file exists (or should exist) but could not be read or parsed.
    #[error("failed to load {}: {reason}", path.display())]
    DataLoad { path: PathBuf, reason: String },

    /// The operation needs at least one plane, or otherwise cannot run in
    /// the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A plane index or ROI index is outside the valid range.
    #[error("{what} index {index} out of range (valid: 0..{len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// Missing threshold, unknown selector in strict mode, etc.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl S2pError {
    pub(crate) fn not_found(path: &Path) -> Self {
        S2pError::NotFound {
            path: path.to_path_buf(),
        }
    }

    pub(crate) fn data_load(path: &Path, reason: impl Into<String>) -> Self {
        S2pError::DataLoad {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub(crate) fn no_planes() -> Self {
        S2pError::InvalidState("dataset contains no imaging planes".to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, S2pError>;
