//! replyr - comment monitoring and reply bot
//!
//! Watches a single post through a browser automation sidecar, generates
//! short replies with a completion model, and submits them while honoring
//! per-author and global rate limits. A durable JSONL ledger guarantees no
//! comment is ever answered twice, including across restarts.

pub mod browser;
pub mod cli;
pub mod completion;
pub mod composer;
pub mod config;
pub mod domain;
pub mod error;
pub mod id;
pub mod ledger;
pub mod limiter;
pub mod orchestrator;
pub mod retry;
pub mod scheduler;
pub mod storage;

pub use error::{ReplyrError, Result};
