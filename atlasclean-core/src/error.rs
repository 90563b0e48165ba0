//! Error types for atlasclean

use crate::geometry::Dims;
use thiserror::Error;

/// Main error type for atlasclean operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid geometry: expected {expected}, found {found}")]
    InvalidGeometry { expected: Dims, found: Dims },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Label {0} has no voxels")]
    EmptyLabel(i16),

    #[error("No relabeling candidate for island {component} of label {label}")]
    NoCandidates { label: i16, component: u32 },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl Error {
    /// Errors the cleaner recovers from locally instead of aborting the run
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::EmptyLabel(_) | Error::NoCandidates { .. })
    }
}

/// Result type alias for atlasclean operations
pub type Result<T> = std::result::Result<T, Error>;
