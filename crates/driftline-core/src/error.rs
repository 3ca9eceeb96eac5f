//! Error types for driftline

use thiserror::Error;

/// Core driftline errors
#[derive(Error, Debug)]
pub enum DriftlineError {
    // Wire errors
    #[error("Buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    // Journal errors
    #[error("Malformed log row: {0}")]
    MalformedRow(String),

    #[error("Cannot open log for append: {0}")]
    LogOpen(String),

    #[error("Log append failed: {0}")]
    LogAppend(String),

    #[error("Cannot open input: {0}")]
    InputOpen(String),

    #[error("Cannot write output: {0}")]
    Output(String),

    // Correlation errors
    #[error("Insufficient data for node {node}: {samples} samples")]
    InsufficientData { node: String, samples: usize },

    #[error("Degenerate regression for node {node}: device time has no variance")]
    DegenerateRegression { node: String },

    // Transport errors
    #[error("Cannot bind {0}")]
    Bind(String),

    #[error("Transport error: {0}")]
    Transport(String),

    // Startup errors
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for driftline operations
pub type DriftlineResult<T> = Result<T, DriftlineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DriftlineError::BufferTooShort {
            expected: 13,
            actual: 8,
        };
        assert_eq!(err.to_string(), "Buffer too short: expected 13, got 8");

        let err = DriftlineError::InsufficientData {
            node: "A".into(),
            samples: 3,
        };
        assert_eq!(err.to_string(), "Insufficient data for node A: 3 samples");
    }
}
