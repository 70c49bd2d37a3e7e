//! Error types for lodcrate

use thiserror::Error;

/// Main error type for lodcrate operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid reduction target: {0}")]
    InvalidTarget(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),
}

/// Result type alias for lodcrate operations
pub type Result<T> = std::result::Result<T, Error>;
