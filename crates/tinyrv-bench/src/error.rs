//! Error types for the benchmark harness

use thiserror::Error;
use tinyrv_runtime::{RuntimeError, XcelError};

/// Result type for benchmark operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Errors raised while loading inputs or running a benchmark
#[derive(Debug, Error)]
pub enum BenchError {
    /// Dataset text could not be parsed
    #[error("Dataset parse error at token {token}: {reason}")]
    Parse {
        /// Zero-based token index
        token: usize,
        /// Reason for failure
        reason: String,
    },

    /// Dataset ended before every declared value was read
    #[error("Dataset truncated: expected {expected} values, found {found}")]
    Truncated {
        /// Values the header promised
        expected: usize,
        /// Values actually present
        found: usize,
    },

    /// Dataset larger than the benchmark's static arrays
    #[error("Dataset size {size} exceeds capacity {capacity}")]
    TooLarge {
        /// Declared size
        size: usize,
        /// Largest size the benchmark accepts
        capacity: usize,
    },

    /// Invalid run configuration
    #[error("Configuration error: {reason}")]
    Config {
        /// Reason for failure
        reason: String,
    },

    /// Unknown benchmark name
    #[error("Unknown benchmark '{name}'")]
    UnknownBenchmark {
        /// Name as given
        name: String,
    },

    /// Runtime failure (spawn, join, topology)
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Accelerator failure
    #[error(transparent)]
    Xcel(#[from] XcelError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Create a parse error
    pub fn parse(token: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            token,
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}
