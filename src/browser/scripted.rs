//! Scripted in-memory driver for tests
//!
//! Scan batches and failures are queued up front; submissions are recorded
//! for later assertions. Once the scan script runs out, further scans return
//! empty batches, which is what a quiet post looks like.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::driver::{BrowserDriver, BrowserError};
use crate::domain::Comment;

/// In-memory `BrowserDriver` driven by a pre-loaded script.
#[derive(Default)]
pub struct ScriptedBrowser {
    scans: Mutex<VecDeque<Result<Vec<Comment>, BrowserError>>>,
    submit_failures: Mutex<VecDeque<BrowserError>>,
    submissions: Mutex<Vec<(String, String)>>,
    post: Option<String>,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_post(post: impl Into<String>) -> Self {
        Self {
            post: Some(post.into()),
            ..Default::default()
        }
    }

    /// Queue a successful scan returning these comments.
    pub fn push_scan(&self, comments: Vec<Comment>) {
        self.scans.lock().unwrap().push_back(Ok(comments));
    }

    /// Queue a failing scan.
    pub fn push_scan_failure(&self, error: BrowserError) {
        self.scans.lock().unwrap().push_back(Err(error));
    }

    /// Make the next `submit_reply` call fail with this error.
    pub fn fail_next_submission(&self, error: BrowserError) {
        self.submit_failures.lock().unwrap().push_back(error);
    }

    /// `(comment_id, text)` pairs in submission order.
    pub fn submissions(&self) -> Vec<(String, String)> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserDriver for ScriptedBrowser {
    async fn scan(&self) -> Result<Vec<Comment>, BrowserError> {
        match self.scans.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(Vec::new()),
        }
    }

    async fn submit_reply(&self, comment_id: &str, text: &str) -> Result<(), BrowserError> {
        if let Some(error) = self.submit_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.submissions
            .lock()
            .unwrap()
            .push((comment_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn post_content(&self) -> Result<Option<String>, BrowserError> {
        Ok(self.post.clone())
    }
}
