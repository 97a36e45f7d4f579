//! Dedup Ledger - durable record of per-comment processing outcomes
//!
//! The ledger is the system's de-duplication source of truth: at most one
//! ProcessingRecord exists per comment id, enforced by the store's atomic
//! insert-if-absent. A lost race is reported as `AlreadyRecorded`, which
//! callers treat as a no-op, never as an error. No comment is ever replied
//! to twice.

use std::sync::Arc;

use crate::domain::{Outcome, ProcessingRecord};
use crate::error::Result;
use crate::storage::{InsertOutcome, Store};

/// Collection holding one ProcessingRecord per comment id.
pub const LEDGER_COLLECTION: &str = "processed_comments";

/// Result of a `record` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// This call finalized the comment's record
    Recorded,
    /// Another attempt already finalized it; benign
    AlreadyRecorded,
}

/// Outcome counts across the whole ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub total: usize,
    pub replied: usize,
    pub failed: usize,
    pub skipped: usize,
    pub unique_authors: usize,
}

/// Wraps the store to answer "has this comment been processed?" and to record
/// outcomes atomically.
pub struct DedupLedger<S: Store> {
    store: Arc<S>,
}

impl<S: Store> DedupLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Whether a final decision has already been recorded for this comment.
    pub fn is_processed(&self, comment_id: &str) -> Result<bool> {
        Ok(self.store.get(LEDGER_COLLECTION, comment_id)?.is_some())
    }

    /// Durably record a finalized decision. Exactly one record per comment id
    /// ever lands; concurrent or replayed attempts observe `AlreadyRecorded`.
    pub fn record(&self, record: &ProcessingRecord) -> Result<RecordStatus> {
        let value = serde_json::to_value(record)?;
        match self.store.insert_if_absent(LEDGER_COLLECTION, &record.comment_id, &value)? {
            InsertOutcome::Inserted => {
                tracing::info!(
                    comment_id = %record.comment_id,
                    author = %record.author_name,
                    outcome = record.outcome.as_str(),
                    "recorded processing outcome"
                );
                Ok(RecordStatus::Recorded)
            }
            InsertOutcome::AlreadyExists => {
                tracing::debug!(
                    comment_id = %record.comment_id,
                    "record already exists, treating as no-op"
                );
                Ok(RecordStatus::AlreadyRecorded)
            }
        }
    }

    /// Fetch the record for a comment, if one exists.
    pub fn get(&self, comment_id: &str) -> Result<Option<ProcessingRecord>> {
        match self.store.get(LEDGER_COLLECTION, comment_id)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// All records, in the order they were finalized.
    pub fn all(&self) -> Result<Vec<ProcessingRecord>> {
        self.store
            .list(LEDGER_COLLECTION)?
            .into_iter()
            .map(|v| Ok(serde_json::from_value(v)?))
            .collect()
    }

    /// Summarize outcome counts across the ledger.
    pub fn statistics(&self) -> Result<LedgerStats> {
        let records = self.all()?;
        let mut stats = LedgerStats {
            total: records.len(),
            ..Default::default()
        };
        let mut authors = std::collections::HashSet::new();
        for record in &records {
            match record.outcome {
                Outcome::Replied => {
                    stats.replied += 1;
                    authors.insert(record.author_id.clone());
                }
                Outcome::FailedPermanently => stats.failed += 1,
                _ => stats.skipped += 1,
            }
        }
        stats.unique_authors = authors.len();
        Ok(stats)
    }
}
