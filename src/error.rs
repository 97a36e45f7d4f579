//! Error types for replyr
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::browser::BrowserError;
use crate::completion::CompletionError;

/// All error types that can occur in replyr
#[derive(Debug, Error)]
pub enum ReplyrError {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Browser driver error
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Completion service error
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    /// Browser session is dead; the loop cannot safely continue
    #[error("Session invalid: {0}")]
    Session(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for replyr operations
pub type Result<T> = std::result::Result<T, ReplyrError>;
