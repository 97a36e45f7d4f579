//! Completion service collaborator
//!
//! Given a rendered prompt, the completion client returns generated reply
//! text or fails. Errors carry their own transient/permanent classification
//! so the composer can feed them to the retry policy.

pub mod client;
pub mod mock;
pub mod openai;

pub use client::{CompletionClient, CompletionError, CompletionRequest};
pub use mock::MockCompletionClient;
pub use openai::{OpenAiClient, OpenAiConfig};
