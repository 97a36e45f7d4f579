//! Comment - a unit of input discovered by a scan
//!
//! Comments are transient: a new batch is built on every scan, and two scans
//! routinely observe the same comment. The `id` is the sole deduplication key;
//! durable state is keyed on it in the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single user-authored comment on the monitored post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Stable identifier, unique per comment on the target post
    pub id: String,

    /// Stable identifier for the comment's author
    pub author_id: String,

    /// Display name of the author, as rendered on the page
    pub author_name: String,

    /// Comment body text
    pub text: String,

    /// When the comment was observed
    pub timestamp: DateTime<Utc>,

    /// True if this comment is itself a reply to one of our prior replies
    #[serde(default)]
    pub is_reply_to_us: bool,
}

impl Comment {
    /// Create a comment observed now, not a reply to us.
    pub fn new(
        id: impl Into<String>,
        author_id: impl Into<String>,
        author_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            author_id: author_id.into(),
            author_name: author_name.into(),
            text: text.into(),
            timestamp: Utc::now(),
            is_reply_to_us: false,
        }
    }

    /// Mark the comment as a reply to one of our own replies.
    pub fn as_reply_to_us(mut self) -> Self {
        self.is_reply_to_us = true;
        self
    }
}
