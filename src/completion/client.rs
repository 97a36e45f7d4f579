//! Completion client trait and shared types

use std::time::Duration;

use async_trait::async_trait;

/// Everything needed for one completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
}

/// Errors from the completion service.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited{}", .retry_after.map(|d| format!(", retry after {:?}", d)).unwrap_or_default())]
    RateLimited { retry_after: Option<Duration> },

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("content policy violation: {0}")]
    ContentPolicy(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("missing API key: environment variable {0} not set")]
    MissingApiKey(String),
}

impl CompletionError {
    /// Whether the retry policy should treat this failure as transient.
    pub fn is_transient(&self) -> bool {
        match self {
            CompletionError::Timeout(_) => true,
            CompletionError::RateLimited { .. } => true,
            CompletionError::Network(_) => true,
            CompletionError::Api { status, .. } => *status >= 500,
            CompletionError::QuotaExceeded(_) => false,
            CompletionError::ContentPolicy(_) => false,
            CompletionError::InvalidResponse(_) => false,
            CompletionError::MissingApiKey(_) => false,
        }
    }
}

/// Stateless completion client; each call is independent.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate reply text for the given prompt.
    async fn generate(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}
