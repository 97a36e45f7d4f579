//! Browser automation collaborator
//!
//! The driver opens the monitored post, extracts comments, and submits reply
//! text. Everything behind the trait is opaque to the core loop, including
//! session/login state; the core only observes success or failure of
//! operations performed through it. Errors carry a transient/permanent hint
//! so the retry policy can classify them per call site.

pub mod driver;
pub mod remote;
pub mod scripted;

pub use driver::{BrowserDriver, BrowserError};
pub use remote::{RemoteDriver, RemoteDriverConfig};
pub use scripted::ScriptedBrowser;
