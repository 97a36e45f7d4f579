//! ProcessingRecord - the durable trace of a decision made about a comment
//!
//! At most one record exists per comment id, enforced by insert-if-absent on
//! the ledger. Records are created once, when the orchestrator finalizes a
//! decision, and never mutated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Comment;

/// Stored comment/reply text is capped to keep records bounded.
const MAX_STORED_TEXT: usize = 1000;

/// Terminal outcome of processing one comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// A reply was generated and submitted
    Replied,
    /// The comment already had a record
    SkippedDuplicate,
    /// A rate cap or cooldown blocked the reply
    SkippedRateLimited,
    /// The comment failed eligibility rules (our own comment, reply to us, empty text)
    SkippedIneligible,
    /// Composition or submission failed with a non-retryable error
    FailedPermanently,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Replied => "replied",
            Outcome::SkippedDuplicate => "skipped_duplicate",
            Outcome::SkippedRateLimited => "skipped_rate_limited",
            Outcome::SkippedIneligible => "skipped_ineligible",
            Outcome::FailedPermanently => "failed_permanently",
        }
    }

    /// True for outcomes that consumed a processing attempt (reply or failure).
    pub fn is_attempted(&self) -> bool {
        matches!(self, Outcome::Replied | Outcome::FailedPermanently)
    }
}

/// The durable trace of a decision made about a comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingRecord {
    pub comment_id: String,
    pub author_id: String,
    pub author_name: String,
    pub comment_text: String,
    pub outcome: Outcome,
    /// Present only when `outcome` is `Replied`
    pub reply_text: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProcessingRecord {
    /// Build a record for a finalized decision about `comment`.
    pub fn new(comment: &Comment, outcome: Outcome, reply_text: Option<String>) -> Self {
        Self {
            comment_id: comment.id.clone(),
            author_id: comment.author_id.clone(),
            author_name: comment.author_name.clone(),
            comment_text: truncate_chars(&comment.text, MAX_STORED_TEXT),
            outcome,
            reply_text: reply_text.map(|t| truncate_chars(&t, MAX_STORED_TEXT)),
            timestamp: Utc::now(),
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
