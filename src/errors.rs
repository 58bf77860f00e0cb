//! Error types for the chart timeline engine
//!
//! Malformed times and structural misuse are always surfaced. Queries never
//! fail: they clamp. A provable no-op and an empty undo/redo history are not
//! errors either, see [`crate::undo::EditOutcome`].

use thiserror::Error;

/// Top-level engine error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    /// A time triple with a zero denominator
    #[error("Invalid time [{whole}, {numerator}, {denominator}]: denominator must not be zero")]
    InvalidTime {
        whole: i64,
        numerator: i64,
        denominator: i64,
    },

    /// Out-of-range value or query input (non-positive bpm, unknown line, ...)
    #[error("Invalid value: {0}")]
    Value(String),

    /// Foreign or detached node, broken time ordering, malformed coverage.
    /// Signals a caller programming error.
    #[error("Structural error: {0}")]
    Structural(String),

    /// Chart JSON could not be read or written
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl ChartError {
    pub fn structural(msg: impl Into<String>) -> Self {
        ChartError::Structural(msg.into())
    }

    pub fn value(msg: impl Into<String>) -> Self {
        ChartError::Value(msg.into())
    }
}

impl From<serde_json::Error> for ChartError {
    fn from(e: serde_json::Error) -> Self {
        ChartError::Serialization(e.to_string())
    }
}

pub type ChartResult<T> = Result<T, ChartError>;
