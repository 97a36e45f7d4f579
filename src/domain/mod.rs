//! Domain types for replyr
//!
//! Comments flow in from scans, get a durable ProcessingRecord when a
//! decision is finalized, and reply counters live in UserStats/RateWindow.

pub mod comment;
pub mod event;
pub mod record;
pub mod scan_state;
pub mod stats;

pub use comment::Comment;
pub use event::{EventLevel, EventRecord};
pub use record::{Outcome, ProcessingRecord};
pub use scan_state::ScanState;
pub use stats::{RateWindow, UserStats};
