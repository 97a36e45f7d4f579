//! Reply Orchestrator - the monitoring-and-reply control loop
//!
//! Wires the browser driver, composer, ledger, limiter, and scheduler into
//! one cycle: scan, filter, compose, submit, record, sleep. The ledger is
//! consulted before any reply and updated after every decision, so a comment
//! is answered at most once across restarts. Budget counters move only after
//! a submission is confirmed.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::watch;

use crate::browser::{BrowserDriver, BrowserError};
use crate::completion::CompletionClient;
use crate::composer::ReplyComposer;
use crate::domain::{Comment, EventLevel, EventRecord, Outcome, ProcessingRecord, ScanState};
use crate::error::{ReplyrError, Result};
use crate::ledger::DedupLedger;
use crate::limiter::RateLimiter;
use crate::retry::{FailureClass, RetryError, RetryPolicy};
use crate::scheduler::ScanScheduler;
use crate::storage::Store;

/// Where the loop currently is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scanning,
    Filtering,
    Composing,
    Submitting,
    Recording,
    ShuttingDown,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Display name the bot posts under, used to skip our own comments
    pub our_name: String,
    /// Write SkippedIneligible records to the ledger instead of only the
    /// in-memory seen set
    pub record_ineligible_skips: bool,
    /// Stop after this many scan cycles (None runs until shutdown)
    pub max_cycles: Option<u64>,
    /// Stop after this many replies across the whole session
    pub max_replies: Option<u64>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            our_name: String::new(),
            record_ineligible_skips: true,
            max_cycles: None,
            max_replies: None,
        }
    }
}

/// Totals reported when the loop exits.
#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    pub cycles: u64,
    pub comments_seen: u64,
    pub replied: u64,
    pub skipped: u64,
    pub failed: u64,
}

pub struct ReplyOrchestrator<B: BrowserDriver, C: CompletionClient, S: Store> {
    browser: Arc<B>,
    composer: ReplyComposer<C>,
    ledger: DedupLedger<S>,
    limiter: RateLimiter<S>,
    scheduler: ScanScheduler,
    retry: RetryPolicy,
    store: Arc<S>,
    config: OrchestratorConfig,
    shutdown: watch::Receiver<bool>,
    state: ScanState,
    seen: HashSet<String>,
    phase: Phase,
}

fn classify_browser(e: &BrowserError) -> FailureClass {
    if e.is_transient() {
        FailureClass::Transient
    } else {
        FailureClass::Permanent
    }
}

impl<B: BrowserDriver, C: CompletionClient, S: Store> ReplyOrchestrator<B, C, S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        browser: Arc<B>,
        composer: ReplyComposer<C>,
        ledger: DedupLedger<S>,
        limiter: RateLimiter<S>,
        scheduler: ScanScheduler,
        retry: RetryPolicy,
        store: Arc<S>,
        config: OrchestratorConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            browser,
            composer,
            ledger,
            limiter,
            scheduler,
            retry,
            store,
            config,
            shutdown,
            state: ScanState::new(),
            seen: HashSet::new(),
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::debug!(from = ?self.phase, to = ?phase, "phase transition");
            self.phase = phase;
        }
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn log_event(&self, event_type: &str, detail: String, level: EventLevel) {
        let event = EventRecord::new(event_type, detail, level);
        if let Err(e) = self.store.append_event(&event) {
            log::warn!("failed to persist {} event: {}", event_type, e);
        }
    }

    /// Run the loop until shutdown, a dead session, or max_cycles.
    pub async fn run(&mut self) -> Result<SessionSummary> {
        let mut summary = SessionSummary::default();

        // Post text is fetched once; a failure here just means comment-only
        // prompts for the whole session.
        let post_context = match self
            .retry
            .execute("post_content", || self.browser.post_content(), classify_browser)
            .await
        {
            Ok(content) => content,
            Err(e) => {
                log::warn!("could not fetch post content, continuing without it: {}", e.inner());
                None
            }
        };

        log::info!(
            "orchestrator starting (post context: {})",
            if post_context.is_some() { "available" } else { "none" }
        );

        while !self.shutdown_requested() {
            self.set_phase(Phase::Scanning);

            let comments = match self
                .retry
                .execute("scan", || self.browser.scan(), classify_browser)
                .await
            {
                Ok(comments) => comments,
                Err(err) => {
                    if err.inner().is_session_dead() {
                        let detail = format!("session invalid during scan: {}", err.inner());
                        log::error!("{}", detail);
                        self.log_event("session_dead", detail.clone(), EventLevel::Critical);
                        self.set_phase(Phase::ShuttingDown);
                        return Err(ReplyrError::Session(detail));
                    }
                    self.state.record_failure();
                    summary.cycles += 1;
                    if self.scheduler.should_alert(&self.state) {
                        let detail = format!(
                            "{} consecutive scan failures, last: {}",
                            self.state.consecutive_failures,
                            err.inner()
                        );
                        log::error!("{}", detail);
                        self.log_event("scan_failures", detail, EventLevel::Critical);
                    } else {
                        log::warn!("scan failed: {}", err.inner());
                    }
                    if self.reached_max_cycles(&summary) {
                        break;
                    }
                    self.sleep_until_next_scan().await;
                    continue;
                }
            };

            let mut fresh = 0usize;
            for comment in &comments {
                if self.shutdown_requested() || self.reached_max_replies(&summary) {
                    break;
                }
                if self.process_comment(comment, post_context.as_deref(), &mut summary, &mut fresh).await? {
                    // session died mid-cycle, stop immediately
                    self.set_phase(Phase::ShuttingDown);
                    return Err(ReplyrError::Session(format!(
                        "session invalid while replying to {}",
                        comment.id
                    )));
                }
            }

            self.set_phase(Phase::Recording);
            self.state.record_scan(fresh);
            summary.cycles += 1;
            summary.comments_seen += fresh as u64;

            log::debug!(
                "cycle {} complete: {} comments, {} fresh",
                summary.cycles,
                comments.len(),
                fresh
            );

            if self.reached_max_cycles(&summary) {
                break;
            }
            if self.reached_max_replies(&summary) {
                log::info!("reply cap reached after {} replies", summary.replied);
                break;
            }

            self.set_phase(Phase::Idle);
            self.sleep_until_next_scan().await;
        }

        self.set_phase(Phase::ShuttingDown);
        log::info!(
            "orchestrator stopping: {} cycles, {} replied, {} skipped, {} failed",
            summary.cycles,
            summary.replied,
            summary.skipped,
            summary.failed
        );
        self.log_event(
            "shutdown",
            format!(
                "cycles={} replied={} skipped={} failed={}",
                summary.cycles, summary.replied, summary.skipped, summary.failed
            ),
            EventLevel::Info,
        );
        Ok(summary)
    }

    /// Handle one comment end to end. Returns true if the browser session
    /// died and the loop must halt.
    async fn process_comment(
        &mut self,
        comment: &Comment,
        post_context: Option<&str>,
        summary: &mut SessionSummary,
        fresh: &mut usize,
    ) -> Result<bool> {
        self.set_phase(Phase::Filtering);

        // Already handled this session, nothing to record.
        if self.seen.contains(&comment.id) {
            return Ok(false);
        }

        // Processed in a previous session; remember it so later scans skip
        // the ledger lookup. The store keeps the original record, so this
        // write is a no-op unless the earlier one was somehow lost.
        if self.ledger.is_processed(&comment.id)? {
            self.ledger
                .record(&ProcessingRecord::new(comment, Outcome::SkippedDuplicate, None))?;
            self.seen.insert(comment.id.clone());
            return Ok(false);
        }

        *fresh += 1;
        self.seen.insert(comment.id.clone());

        if self.is_ineligible(comment) {
            log::debug!("skipping ineligible comment {}", comment.id);
            if self.config.record_ineligible_skips {
                self.ledger
                    .record(&ProcessingRecord::new(comment, Outcome::SkippedIneligible, None))?;
            }
            summary.skipped += 1;
            return Ok(false);
        }

        let verdict = self.limiter.may_reply(&comment.author_id)?;
        if !verdict.is_allowed() {
            log::info!(
                "rate limit ({}) blocks reply to {} by {}",
                verdict.reason(),
                comment.id,
                comment.author_name
            );
            self.ledger
                .record(&ProcessingRecord::new(comment, Outcome::SkippedRateLimited, None))?;
            summary.skipped += 1;
            return Ok(false);
        }

        self.set_phase(Phase::Composing);
        let reply = match self.composer.compose(comment, post_context).await {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("compose failed for {}: {}", comment.id, e);
                self.log_event(
                    "compose_failed",
                    format!("comment {}: {}", comment.id, e),
                    EventLevel::Warning,
                );
                self.ledger
                    .record(&ProcessingRecord::new(comment, Outcome::FailedPermanently, None))?;
                summary.failed += 1;
                return Ok(false);
            }
        };

        self.set_phase(Phase::Submitting);
        let submitted = self
            .retry
            .execute(
                "submit_reply",
                || self.browser.submit_reply(&comment.id, &reply),
                classify_browser,
            )
            .await;

        match submitted {
            Ok(()) => {
                self.ledger.record(&ProcessingRecord::new(
                    comment,
                    Outcome::Replied,
                    Some(reply.clone()),
                ))?;
                self.limiter.record_reply(&comment.author_id, &comment.author_name)?;
                summary.replied += 1;
                log::info!("replied to {} by {}", comment.id, comment.author_name);
                Ok(false)
            }
            Err(err) => {
                let session_dead = err.inner().is_session_dead();
                log::warn!("submission failed for {}: {}", comment.id, err.inner());
                self.ledger
                    .record(&ProcessingRecord::new(comment, Outcome::FailedPermanently, None))?;
                summary.failed += 1;
                if session_dead {
                    self.log_event(
                        "session_dead",
                        format!("session invalid while replying to {}", comment.id),
                        EventLevel::Critical,
                    );
                }
                Ok(session_dead)
            }
        }
    }

    fn is_ineligible(&self, comment: &Comment) -> bool {
        if comment.is_reply_to_us {
            return true;
        }
        if !self.config.our_name.is_empty()
            && comment.author_name.eq_ignore_ascii_case(&self.config.our_name)
        {
            return true;
        }
        comment.text.trim().chars().count() < 2
    }

    fn reached_max_cycles(&self, summary: &SessionSummary) -> bool {
        self.config
            .max_cycles
            .is_some_and(|max| summary.cycles >= max)
    }

    fn reached_max_replies(&self, summary: &SessionSummary) -> bool {
        self.config
            .max_replies
            .is_some_and(|max| summary.replied >= max)
    }

    async fn sleep_until_next_scan(&mut self) {
        let delay = self.scheduler.next_delay(&self.state);
        log::debug!("sleeping {:.1}s until next scan", delay.as_secs_f64());
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = sleep.as_mut() => return,
                changed = self.shutdown.changed() => match changed {
                    Ok(()) if *self.shutdown.borrow() => {
                        log::info!("shutdown requested during sleep");
                        return;
                    }
                    Ok(()) => {}
                    Err(_) => {
                        // Sender gone, no shutdown signal can arrive; just
                        // finish the sleep.
                        sleep.as_mut().await;
                        return;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tempfile::TempDir;

    use crate::browser::ScriptedBrowser;
    use crate::completion::MockCompletionClient;
    use crate::composer::ComposerConfig;
    use crate::limiter::RateLimitConfig;
    use crate::scheduler::{ScanScheduler, SchedulerConfig};
    use crate::storage::JsonlStore;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(2, Duration::from_millis(1), 2.0, Duration::from_millis(5))
    }

    fn fast_scheduler() -> ScanScheduler {
        ScanScheduler::new(SchedulerConfig {
            base_interval: Duration::from_millis(1),
            min_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(5),
            jitter: 0.0,
            ..Default::default()
        })
    }

    fn build(
        browser: Arc<ScriptedBrowser>,
        client: Arc<MockCompletionClient>,
        store: Arc<JsonlStore>,
        config: OrchestratorConfig,
    ) -> (
        ReplyOrchestrator<ScriptedBrowser, MockCompletionClient, JsonlStore>,
        watch::Sender<bool>,
    ) {
        let (tx, rx) = watch::channel(false);
        let orchestrator = ReplyOrchestrator::new(
            browser,
            ReplyComposer::new(client, fast_retry(), ComposerConfig::default()),
            DedupLedger::new(store.clone()),
            RateLimiter::new(store.clone(), RateLimitConfig::default()),
            fast_scheduler(),
            fast_retry(),
            store,
            config,
            rx,
        );
        (orchestrator, tx)
    }

    #[tokio::test]
    async fn test_replies_to_fresh_comment() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonlStore::open(dir.path()).unwrap());
        let browser = Arc::new(ScriptedBrowser::new());
        browser.push_scan(vec![Comment::new("c1", "u1", "Alice", "love this post")]);
        let client = Arc::new(MockCompletionClient::new());
        client.push_reply("Thanks Alice, glad you enjoyed it.");

        let (mut orchestrator, _tx) = build(
            browser.clone(),
            client,
            store,
            OrchestratorConfig {
                max_cycles: Some(1),
                ..Default::default()
            },
        );
        let summary = orchestrator.run().await.unwrap();

        assert_eq!(summary.replied, 1);
        assert_eq!(browser.submissions().len(), 1);
        assert_eq!(browser.submissions()[0].0, "c1");
    }

    #[tokio::test]
    async fn test_same_comment_twice_in_one_session_replies_once() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonlStore::open(dir.path()).unwrap());
        let browser = Arc::new(ScriptedBrowser::new());
        let comment = Comment::new("c1", "u1", "Alice", "love this post");
        browser.push_scan(vec![comment.clone()]);
        browser.push_scan(vec![comment]);
        let client = Arc::new(MockCompletionClient::new());
        client.push_reply("Thanks!");

        let (mut orchestrator, _tx) = build(
            browser.clone(),
            client,
            store,
            OrchestratorConfig {
                max_cycles: Some(2),
                ..Default::default()
            },
        );
        let summary = orchestrator.run().await.unwrap();

        assert_eq!(summary.replied, 1);
        assert_eq!(browser.submissions().len(), 1);
    }

    #[tokio::test]
    async fn test_own_comments_are_skipped() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonlStore::open(dir.path()).unwrap());
        let browser = Arc::new(ScriptedBrowser::new());
        browser.push_scan(vec![
            Comment::new("c1", "bot", "ReplyBot", "thanks everyone"),
            Comment::new("c2", "u1", "Alice", "nice"),
        ]);
        let client = Arc::new(MockCompletionClient::new());
        client.push_reply("Appreciate it!");

        let (mut orchestrator, _tx) = build(
            browser.clone(),
            client,
            store.clone(),
            OrchestratorConfig {
                our_name: "replybot".into(),
                max_cycles: Some(1),
                ..Default::default()
            },
        );
        let summary = orchestrator.run().await.unwrap();

        assert_eq!(summary.replied, 1);
        assert_eq!(summary.skipped, 1);
        let ledger = DedupLedger::new(store);
        let record = ledger.get("c1").unwrap().unwrap();
        assert_eq!(record.outcome, Outcome::SkippedIneligible);
    }

    #[tokio::test]
    async fn test_dropped_shutdown_sender_still_sleeps_between_cycles() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonlStore::open(dir.path()).unwrap());
        let browser = Arc::new(ScriptedBrowser::new());
        let client = Arc::new(MockCompletionClient::new());

        // Sender dropped without ever signalling, as happens when the
        // ctrl-c task exits early.
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let scheduler = ScanScheduler::new(SchedulerConfig {
            base_interval: Duration::from_millis(30),
            min_interval: Duration::from_millis(30),
            max_interval: Duration::from_millis(60),
            jitter: 0.0,
            ..Default::default()
        });
        let mut orchestrator = ReplyOrchestrator::new(
            browser,
            ReplyComposer::new(client, fast_retry(), ComposerConfig::default()),
            DedupLedger::new(store.clone()),
            RateLimiter::new(store.clone(), RateLimitConfig::default()),
            scheduler,
            fast_retry(),
            store,
            OrchestratorConfig {
                max_cycles: Some(2),
                ..Default::default()
            },
            rx,
        );

        let started = std::time::Instant::now();
        let summary = orchestrator.run().await.unwrap();

        assert_eq!(summary.cycles, 2);
        // The inter-cycle sleep must run to completion rather than being
        // cut short by the closed channel.
        assert!(
            started.elapsed() >= Duration::from_millis(25),
            "loop spun without sleeping: {:?}",
            started.elapsed()
        );
    }

    #[tokio::test]
    async fn test_replay_of_replied_comment_keeps_original_record() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonlStore::open(dir.path()).unwrap());
        let comment = Comment::new("c1", "u1", "Alice", "love this post");

        let browser = Arc::new(ScriptedBrowser::new());
        browser.push_scan(vec![comment.clone()]);
        let client = Arc::new(MockCompletionClient::new());
        client.push_reply("Thanks Alice!");
        let (mut orchestrator, _tx) = build(
            browser,
            client,
            store.clone(),
            OrchestratorConfig {
                max_cycles: Some(1),
                ..Default::default()
            },
        );
        assert_eq!(orchestrator.run().await.unwrap().replied, 1);

        // Later session sees the same comment again.
        let browser = Arc::new(ScriptedBrowser::new());
        browser.push_scan(vec![comment]);
        let client = Arc::new(MockCompletionClient::new());
        let (mut orchestrator, _tx) = build(
            browser.clone(),
            client.clone(),
            store.clone(),
            OrchestratorConfig {
                max_cycles: Some(1),
                ..Default::default()
            },
        );
        let summary = orchestrator.run().await.unwrap();

        assert_eq!(summary.replied, 0);
        assert_eq!(client.call_count(), 0);
        assert!(browser.submissions().is_empty());
        // The original record wins over the duplicate skip.
        let ledger = DedupLedger::new(store);
        let record = ledger.get("c1").unwrap().unwrap();
        assert_eq!(record.outcome, Outcome::Replied);
        assert_eq!(record.reply_text.as_deref(), Some("Thanks Alice!"));
    }

    #[tokio::test]
    async fn test_reply_cap_stops_session() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonlStore::open(dir.path()).unwrap());
        let browser = Arc::new(ScriptedBrowser::new());
        browser.push_scan(vec![
            Comment::new("c1", "u1", "Alice", "first"),
            Comment::new("c2", "u2", "Bob", "second"),
            Comment::new("c3", "u3", "Carol", "third"),
        ]);
        let client = Arc::new(MockCompletionClient::new());
        client.push_reply("Hi Alice!");
        client.push_reply("Hi Bob!");
        client.push_reply("Hi Carol!");

        let (mut orchestrator, _tx) = build(
            browser.clone(),
            client,
            store.clone(),
            OrchestratorConfig {
                max_cycles: Some(3),
                max_replies: Some(2),
                ..Default::default()
            },
        );
        let summary = orchestrator.run().await.unwrap();

        assert_eq!(summary.replied, 2);
        assert_eq!(browser.submissions().len(), 2);
        // The capped comment was never touched, so a later session with a
        // fresh budget can still reply to it.
        let ledger = DedupLedger::new(store);
        assert!(ledger.get("c3").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_death_during_scan_halts() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonlStore::open(dir.path()).unwrap());
        let browser = Arc::new(ScriptedBrowser::new());
        browser.push_scan_failure(BrowserError::SessionInvalid("logged out".into()));
        let client = Arc::new(MockCompletionClient::new());

        let (mut orchestrator, _tx) = build(
            browser,
            client,
            store,
            OrchestratorConfig {
                max_cycles: Some(3),
                ..Default::default()
            },
        );
        let err = orchestrator.run().await.unwrap_err();
        assert!(matches!(err, ReplyrError::Session(_)));
    }
}
