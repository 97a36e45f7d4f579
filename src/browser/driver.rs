//! Browser driver trait and error types

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Comment;

/// Failures surfaced by the browser driver.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Page navigation or load failure; retryable
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// An expected element was missing this attempt; retryable
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// The logged-in session is gone; the loop cannot safely continue
    #[error("session invalid: {0}")]
    SessionInvalid(String),

    /// Reply submission failed; the driver says whether retrying is sensible
    #[error("submission failed: {message}")]
    Submission { message: String, transient: bool },
}

impl BrowserError {
    /// Whether the retry policy should treat this failure as transient.
    pub fn is_transient(&self) -> bool {
        match self {
            BrowserError::Navigation(_) => true,
            BrowserError::ElementNotFound(_) => true,
            BrowserError::SessionInvalid(_) => false,
            BrowserError::Submission { transient, .. } => *transient,
        }
    }

    /// Whether this failure means the whole session is dead.
    pub fn is_session_dead(&self) -> bool {
        matches!(self, BrowserError::SessionInvalid(_))
    }
}

/// Contract for the browser automation driver.
///
/// One driver instance corresponds to one logged-in session on one post.
/// Submission through that session is inherently sequential; the orchestrator
/// never issues a second call before the first resolves.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Scan the post for currently visible comments. The same comment may be
    /// returned by consecutive scans; deduplication is the caller's job.
    async fn scan(&self) -> Result<Vec<Comment>, BrowserError>;

    /// Submit `text` as a reply to the given comment.
    async fn submit_reply(&self, comment_id: &str, text: &str) -> Result<(), BrowserError>;

    /// Body text of the monitored post, used as reply context when available.
    async fn post_content(&self) -> Result<Option<String>, BrowserError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_is_transient() {
        assert!(BrowserError::Navigation("timeout".into()).is_transient());
        assert!(BrowserError::ElementNotFound("reply box".into()).is_transient());
    }

    #[test]
    fn test_session_invalid_is_permanent() {
        let err = BrowserError::SessionInvalid("login expired".into());
        assert!(!err.is_transient());
        assert!(err.is_session_dead());
    }

    #[test]
    fn test_submission_carries_hint() {
        let transient = BrowserError::Submission {
            message: "widget detached".into(),
            transient: true,
        };
        let permanent = BrowserError::Submission {
            message: "content rejected".into(),
            transient: false,
        };
        assert!(transient.is_transient());
        assert!(!permanent.is_transient());
        assert!(!permanent.is_session_dead());
    }

    #[test]
    fn test_error_display() {
        let err = BrowserError::Submission {
            message: "content rejected".into(),
            transient: false,
        };
        assert_eq!(err.to_string(), "submission failed: content rejected");
    }
}
