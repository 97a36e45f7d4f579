//! Mock completion client for tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::{CompletionClient, CompletionError, CompletionRequest};

/// Scripted `CompletionClient`. Responses are consumed in order; once the
/// script runs out, a canned reply is returned.
#[derive(Default)]
pub struct MockCompletionClient {
    responses: Mutex<VecDeque<Result<String, CompletionError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful generation.
    pub fn push_reply(&self, text: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(text.into()));
    }

    /// Queue a failing generation.
    pub fn push_failure(&self, error: CompletionError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Requests observed so far, in call order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.responses.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok("Thanks for your comment!".to_string()),
        }
    }
}
