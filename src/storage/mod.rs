//! Persistent store collaborator
//!
//! The ledger and the rate limiter both sit on top of the `Store` trait; the
//! only implementation is an append-only JSONL file store with an in-memory
//! cache. All writes are single-record; the design never needs cross-record
//! atomicity.

pub mod jsonl;
pub mod traits;

pub use jsonl::JsonlStore;
pub use traits::{InsertOutcome, Store};
