//! Test error types.

use switchyard::AssemblyError;
use thiserror::Error;

/// Errors that can occur while preparing or reading a test event.
#[derive(Debug, Error)]
pub enum TestError {
    /// The application failed to assemble.
    #[error("assembly failed: {0}")]
    Assembly(#[from] AssemblyError),

    /// A header name or value was rejected.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The request target was empty or malformed.
    #[error("invalid target: {0}")]
    InvalidTarget(String),
}
