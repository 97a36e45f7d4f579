//! Reply composition pipeline

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};
use thiserror::Error;

use super::templates;
use super::validate::{ReplyLimits, sanitize_text, validate_reply};
use crate::completion::{CompletionClient, CompletionRequest};
use crate::domain::Comment;
use crate::retry::{FailureClass, RetryPolicy};

/// Comment and post text fed into prompts is capped to keep calls cheap.
const MAX_PROMPT_COMMENT: usize = 500;
const MAX_PROMPT_POST: usize = 500;

/// Response cache bounds: at `max` entries the oldest `evict` are dropped.
const CACHE_MAX: usize = 100;
const CACHE_EVICT: usize = 20;

/// A failure to compose a reply. Always permanent for the comment at hand;
/// the transient/retry handling already happened inside the completion call.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("comment text empty or too short")]
    EmptyComment,

    #[error("completion failed: {0}")]
    Completion(String),

    #[error("reply rejected: {0}")]
    Rejected(String),
}

/// Composer settings.
#[derive(Debug, Clone, Default)]
pub struct ComposerConfig {
    /// Extra persona/style text appended to the system prompt
    pub persona: Option<String>,
    pub limits: ReplyLimits,
}

/// Bounded cache of recent replies keyed by a digest of post + comment text.
/// A hit skips the completion call; validation still runs.
struct ResponseCache {
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

impl ResponseCache {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: String, value: String) {
        if self.entries.len() >= CACHE_MAX {
            for _ in 0..CACHE_EVICT {
                if let Some(old) = self.order.pop_front() {
                    self.entries.remove(&old);
                }
            }
        }
        if self.entries.insert(key.clone(), value).is_none() {
            self.order.push_back(key);
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

fn cache_key(post: &str, comment: &str) -> String {
    let prefix: String = post.chars().take(200).collect();
    let digest = Sha256::digest(format!("{}|{}", prefix, comment).as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// Turns a comment plus post context into validated reply text via the
/// completion service.
pub struct ReplyComposer<C: CompletionClient> {
    client: Arc<C>,
    retry: RetryPolicy,
    config: ComposerConfig,
    cache: Mutex<ResponseCache>,
}

impl<C: CompletionClient> ReplyComposer<C> {
    pub fn new(client: Arc<C>, retry: RetryPolicy, config: ComposerConfig) -> Self {
        Self {
            client,
            retry,
            config,
            cache: Mutex::new(ResponseCache::new()),
        }
    }

    fn system_prompt(&self) -> String {
        match &self.config.persona {
            Some(persona) => format!("{} {}", templates::SYSTEM_PROMPT, persona),
            None => templates::SYSTEM_PROMPT.to_string(),
        }
    }

    /// Compose a reply for `comment`. Any error is permanent for this
    /// comment; the caller records `failed_permanently` and moves on.
    pub async fn compose(&self, comment: &Comment, post_context: Option<&str>) -> Result<String, ComposeError> {
        let comment_clean = sanitize_text(&comment.text, MAX_PROMPT_COMMENT);
        if comment_clean.chars().count() < 2 {
            return Err(ComposeError::EmptyComment);
        }

        let post_clean = post_context.map(|p| sanitize_text(p, MAX_PROMPT_POST));
        let key = cache_key(post_clean.as_deref().unwrap_or(""), &comment_clean);

        if let Some(cached) = self.cache.lock().expect("cache lock").get(&key) {
            tracing::debug!(comment_id = %comment.id, "using cached reply for similar comment");
            validate_reply(&cached, comment, &self.config.limits)?;
            return Ok(cached);
        }

        let request = CompletionRequest {
            system_prompt: self.system_prompt(),
            user_prompt: templates::build_prompt(&comment_clean, post_clean.as_deref()),
        };

        let reply = self
            .retry
            .execute(
                "completion",
                || {
                    let client = self.client.clone();
                    let request = request.clone();
                    async move { client.generate(&request).await }
                },
                |e| {
                    if e.is_transient() {
                        FailureClass::Transient
                    } else {
                        FailureClass::Permanent
                    }
                },
            )
            .await
            .map_err(|e| ComposeError::Completion(e.into_inner().to_string()))?;

        let reply = reply.trim().to_string();
        validate_reply(&reply, comment, &self.config.limits)?;

        self.cache.lock().expect("cache lock").insert(key, reply.clone());
        tracing::info!(
            comment_id = %comment.id,
            reply_chars = reply.chars().count(),
            "composed reply"
        );
        Ok(reply)
    }

    #[cfg(test)]
    fn cache_len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }
}
