//! Error types for multipath datasets

use std::io;
use thiserror::Error;

/// Result type for multipath dataset operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for multipath dataset operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error while loading configuration
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error while loading configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No registered backend accepted a raw path
    #[error("No backend accepts path {index}: {}", reasons.join("; "))]
    UnresolvableBackend {
        /// Position of the rejected input
        index: usize,
        /// One rejection reason per backend, in priority order
        reasons: Vec<String>,
    },

    /// Operation that is not defined for composite datasets
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Dimension lookup failed
    #[error("Dimension not found: {0}")]
    DimensionNotFound(String),

    /// Index out of bounds
    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Length of the indexed collection
        len: usize,
    },

    /// Values of incomparable types
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Paths disagree on their dimension schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A table was handed to a backend that does not own it
    #[error("Backend mismatch: expected {expected} table, found {found}")]
    BackendMismatch {
        /// Datatype the backend handles
        expected: String,
        /// Datatype tag carried by the table
        found: String,
    },

    /// No backend is registered for a table's datatype
    #[error("No backend registered for datatype {0}")]
    UnknownDatatype(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Build an [`Error::UnsupportedOperation`] for the named operation
    pub fn unsupported(operation: &str) -> Self {
        Error::UnsupportedOperation(format!(
            "{operation} is not defined for multi-path datasets; flatten to a single table first"
        ))
    }
}
