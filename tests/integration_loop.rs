//! End-to-end loop tests with a scripted browser and mock completion client
//!
//! Every scenario drives the real orchestrator against a real JSONL store in
//! a temp directory, with jitter disabled and millisecond intervals so the
//! loop runs to completion quickly.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::watch;

use replyr::browser::{BrowserError, ScriptedBrowser};
use replyr::completion::{CompletionError, MockCompletionClient};
use replyr::composer::{ComposerConfig, ReplyComposer};
use replyr::domain::{Comment, Outcome};
use replyr::ledger::DedupLedger;
use replyr::limiter::{RateLimitConfig, RateLimiter};
use replyr::orchestrator::{OrchestratorConfig, ReplyOrchestrator};
use replyr::retry::RetryPolicy;
use replyr::scheduler::{ScanScheduler, SchedulerConfig};
use replyr::storage::JsonlStore;
use replyr::ReplyrError;

struct Harness {
    store: Arc<JsonlStore>,
    browser: Arc<ScriptedBrowser>,
    client: Arc<MockCompletionClient>,
    limits: RateLimitConfig,
    config: OrchestratorConfig,
    _dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonlStore::open(dir.path()).unwrap());
        Self {
            store,
            browser: Arc::new(ScriptedBrowser::new()),
            client: Arc::new(MockCompletionClient::new()),
            limits: RateLimitConfig::default(),
            config: OrchestratorConfig::default(),
            _dir: dir,
        }
    }

    fn reopen_store(&mut self) {
        self.store = Arc::new(JsonlStore::open(self._dir.path()).unwrap());
    }

    fn orchestrator(
        &self,
        max_cycles: u64,
    ) -> (
        ReplyOrchestrator<ScriptedBrowser, MockCompletionClient, JsonlStore>,
        watch::Sender<bool>,
    ) {
        let retry = RetryPolicy::new(2, Duration::from_millis(1), 2.0, Duration::from_millis(5));
        let scheduler = ScanScheduler::new(SchedulerConfig {
            base_interval: Duration::from_millis(1),
            min_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(10),
            jitter: 0.0,
            ..Default::default()
        });
        let (tx, rx) = watch::channel(false);
        let mut config = self.config.clone();
        config.max_cycles = Some(max_cycles);
        let orchestrator = ReplyOrchestrator::new(
            self.browser.clone(),
            ReplyComposer::new(self.client.clone(), retry.clone(), ComposerConfig::default()),
            DedupLedger::new(self.store.clone()),
            RateLimiter::new(self.store.clone(), self.limits.clone()),
            scheduler,
            retry,
            self.store.clone(),
            config,
            rx,
        );
        (orchestrator, tx)
    }

    fn ledger(&self) -> DedupLedger<JsonlStore> {
        DedupLedger::new(self.store.clone())
    }
}

#[tokio::test]
async fn test_overlapping_scans_never_reply_twice() {
    let harness = Harness::new();
    let c1 = Comment::new("c1", "u1", "Alice", "great write-up");
    let c2 = Comment::new("c2", "u2", "Bob", "very helpful, thanks");

    // c1 appears in both scans, c2 only in the second
    harness.browser.push_scan(vec![c1.clone()]);
    harness.browser.push_scan(vec![c1, c2]);
    harness.client.push_reply("Thanks Alice!");
    harness.client.push_reply("Glad it helped, Bob!");

    let (mut orchestrator, _tx) = harness.orchestrator(2);
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.replied, 2);
    let submissions = harness.browser.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].0, "c1");
    assert_eq!(submissions[1].0, "c2");
}

#[tokio::test]
async fn test_per_author_cap_blocks_second_reply() {
    let mut harness = Harness::new();
    harness.limits = RateLimitConfig {
        max_replies_per_user: 1,
        ..Default::default()
    };
    harness.browser.push_scan(vec![
        Comment::new("c1", "u1", "Alice", "first comment"),
        Comment::new("c2", "u1", "Alice", "second comment"),
    ]);
    harness.client.push_reply("Thanks!");
    harness.client.push_reply("Thanks again!");

    let (mut orchestrator, _tx) = harness.orchestrator(1);
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.replied, 1);
    assert_eq!(summary.skipped, 1);

    let ledger = harness.ledger();
    assert_eq!(ledger.get("c1").unwrap().unwrap().outcome, Outcome::Replied);
    assert_eq!(
        ledger.get("c2").unwrap().unwrap().outcome,
        Outcome::SkippedRateLimited
    );

    let limiter = RateLimiter::new(harness.store.clone(), harness.limits.clone());
    assert_eq!(limiter.user_window_count("u1").unwrap(), 1);
}

#[tokio::test]
async fn test_restart_is_idempotent() {
    let mut harness = Harness::new();
    let comment = Comment::new("c1", "u1", "Alice", "nice post");
    harness.browser.push_scan(vec![comment.clone()]);
    harness.client.push_reply("Thanks!");

    let (mut orchestrator, _tx) = harness.orchestrator(1);
    let summary = orchestrator.run().await.unwrap();
    assert_eq!(summary.replied, 1);

    // Simulate a restart: fresh store handle, fresh orchestrator, same scan.
    harness.reopen_store();
    harness.browser.push_scan(vec![comment]);
    harness.client.push_reply("Should never be sent");

    let (mut orchestrator, _tx) = harness.orchestrator(1);
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.replied, 0);
    assert_eq!(harness.browser.submissions().len(), 1);
    // The completion client was never consulted for the duplicate
    assert_eq!(harness.client.call_count(), 1);
}

#[tokio::test]
async fn test_compose_failure_does_not_block_other_comments() {
    let harness = Harness::new();
    harness.browser.push_scan(vec![
        Comment::new("c1", "u1", "Alice", "first"),
        Comment::new("c2", "u2", "Bob", "second"),
    ]);
    harness
        .client
        .push_failure(CompletionError::ContentPolicy("flagged".into()));
    harness.client.push_reply("Thanks Bob!");

    let (mut orchestrator, _tx) = harness.orchestrator(1);
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.replied, 1);

    let ledger = harness.ledger();
    assert_eq!(
        ledger.get("c1").unwrap().unwrap().outcome,
        Outcome::FailedPermanently
    );
    assert_eq!(ledger.get("c2").unwrap().unwrap().outcome, Outcome::Replied);
}

#[tokio::test]
async fn test_failed_submission_consumes_no_budget() {
    let harness = Harness::new();
    harness
        .browser
        .push_scan(vec![Comment::new("c1", "u1", "Alice", "hello there")]);
    harness.client.push_reply("Hi Alice!");
    harness.browser.fail_next_submission(BrowserError::Submission {
        message: "comment box not found".into(),
        transient: false,
    });

    let (mut orchestrator, _tx) = harness.orchestrator(1);
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.replied, 0);

    let limiter = RateLimiter::new(harness.store.clone(), harness.limits.clone());
    assert_eq!(limiter.user_window_count("u1").unwrap(), 0);
}

#[tokio::test]
async fn test_session_death_during_submission_halts_loop() {
    let harness = Harness::new();
    harness.browser.push_scan(vec![
        Comment::new("c1", "u1", "Alice", "first"),
        Comment::new("c2", "u2", "Bob", "second"),
    ]);
    harness.client.push_reply("Hi Alice!");
    harness.client.push_reply("Hi Bob!");
    harness
        .browser
        .fail_next_submission(BrowserError::SessionInvalid("cookie expired".into()));

    let (mut orchestrator, _tx) = harness.orchestrator(3);
    let err = orchestrator.run().await.unwrap_err();
    assert!(matches!(err, ReplyrError::Session(_)));

    // The failed comment was recorded before the halt, the next one was
    // never attempted.
    let ledger = harness.ledger();
    assert_eq!(
        ledger.get("c1").unwrap().unwrap().outcome,
        Outcome::FailedPermanently
    );
    assert!(ledger.get("c2").unwrap().is_none());
}

#[tokio::test]
async fn test_shutdown_request_stops_loop() {
    let harness = Harness::new();
    // Endless empty scans; only the shutdown signal can end the run.
    let (mut orchestrator, tx) = harness.orchestrator(u64::MAX);

    let handle = tokio::spawn(async move { orchestrator.run().await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    tx.send(true).unwrap();

    let summary = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop did not stop after shutdown")
        .unwrap()
        .unwrap();
    assert_eq!(summary.replied, 0);
}
