//! Store trait definition.

use serde_json::Value;

use crate::domain::EventRecord;
use crate::error::Result;

/// Result of an insert-if-absent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The key was absent and the record was written
    Inserted,
    /// A record already existed under this key; nothing was written
    AlreadyExists,
}

/// Durable key-value record store.
///
/// `insert_if_absent` must be atomic with respect to concurrent calls for the
/// same key: exactly one caller observes `Inserted`. That single guarantee is
/// what the dedup invariant rests on.
pub trait Store: Send + Sync {
    /// Write `value` under `key` only if no record exists for it.
    fn insert_if_absent(&self, collection: &str, key: &str, value: &Value) -> Result<InsertOutcome>;

    /// Fetch the record under `key`, if any.
    fn get(&self, collection: &str, key: &str) -> Result<Option<Value>>;

    /// Upsert the record under `key`. Used only for counter records the
    /// limiter owns; ledger records are never overwritten.
    fn put(&self, collection: &str, key: &str, value: &Value) -> Result<()>;

    /// Append an entry to the event log.
    fn append_event(&self, event: &EventRecord) -> Result<()>;

    /// All records in a collection, in first-insertion order.
    fn list(&self, collection: &str) -> Result<Vec<Value>>;
}
