//! Network error types for framing, parameter binding and dispatch.

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur while encoding or decoding wire records.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Record body isn't a valid record.
    #[error("Invalid record: {0}")]
    Json(#[from] serde_json::Error),

    /// Record exceeded the maximum allowed size.
    #[error("Record size {actual} exceeds maximum {max}")]
    RecordTooLarge { actual: usize, max: usize },

    /// Record bytes aren't UTF-8.
    #[error("Record isn't UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// A declared parameter couldn't be bound from a record.
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("missing parameter `{name}` (position {index})")]
    Missing { name: &'static str, index: usize },

    #[error("parameter `{name}` has the wrong type: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A registered handler failed. Carries the full record for diagnosis.
#[derive(Debug, Error)]
#[error("handler for `{name}` failed (args {args:?}, kwargs {kwargs:?}): {source}")]
pub struct DispatchError {
    pub name: String,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
    #[source]
    pub source: anyhow::Error,
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
