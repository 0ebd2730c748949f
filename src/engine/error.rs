//! Engine error types
//!
//! Errors raised by text-map extraction, overlay edits, rasterization and
//! structural page operations.

use thiserror::Error;

use super::geometry::BoundingBox;

/// Unified engine error type
#[derive(Debug, Error)]
pub enum EngineError {
    /// Document, block or word not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Page number outside `1..=max`
    #[error("Invalid page number: {requested} (max: {max})")]
    OutOfRange { requested: usize, max: usize },

    /// Degenerate bounding box supplied or computed
    #[error("Invalid bounding box: {0}")]
    InvalidGeometry(BoundingBox),

    /// File unreadable or not a parseable PDF
    #[error("Failed to read document: {0}")]
    DocumentRead(String),

    /// File could not be written back
    #[error("Failed to write document: {0}")]
    DocumentWrite(String),

    /// Rasterization or image encoding failed
    #[error("Render error: {0}")]
    Render(String),

    /// Input rejected before any work was done
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    /// Blocking work did not finish in time
    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    /// Blocking task panicked or was cancelled
    #[error("Worker error: {0}")]
    Worker(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

impl From<mupdf::Error> for EngineError {
    fn from(err: mupdf::Error) -> Self {
        EngineError::DocumentRead(err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::DocumentRead(err.to_string())
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(err: tokio::task::JoinError) -> Self {
        EngineError::Worker(err.to_string())
    }
}

/// Validate a 1-based page number against a page count.
pub fn check_page(page_number: usize, page_count: usize) -> Result<()> {
    if page_number < 1 || page_number > page_count {
        return Err(EngineError::OutOfRange {
            requested: page_number,
            max: page_count,
        });
    }
    Ok(())
}
