//! Reply Composer - turns a comment plus post context into reply text
//!
//! Calling the service and validating the result are deliberately split:
//! the call is retryable and transient, validation is deterministic and
//! never retries the completion.

pub mod compose;
pub mod templates;
pub mod validate;

pub use compose::{ComposeError, ComposerConfig, ReplyComposer};
pub use validate::{sanitize_text, ReplyLimits};
