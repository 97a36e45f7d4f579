//! In-memory scan state owned by the orchestrator
//!
//! Initialized at startup, mutated after every scan, discarded on shutdown.
//! A restart begins with a fresh cadence; the ledger still prevents
//! duplicate replies.

use chrono::{DateTime, Utc};

/// Process-wide scan bookkeeping. Feeds the scan scheduler and the session
/// summary; never persisted.
#[derive(Debug, Clone, Default)]
pub struct ScanState {
    /// When the last scan attempt finished (success or failure)
    pub last_scan_at: Option<DateTime<Utc>>,
    /// Scans in a row that surfaced no fresh comments
    pub consecutive_empty_scans: u32,
    /// Scan attempts in a row that failed at the browser level
    pub consecutive_failures: u32,
    /// Total scan attempts this session
    pub total_scans: u64,
    /// Total failed scan attempts this session
    pub total_failures: u64,
    /// Fresh comments surfaced this session
    pub comments_seen: u64,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed scan that surfaced `fresh` not-yet-processed comments.
    pub fn record_scan(&mut self, fresh: usize) {
        self.total_scans += 1;
        self.last_scan_at = Some(Utc::now());
        self.consecutive_failures = 0;
        if fresh == 0 {
            self.consecutive_empty_scans += 1;
        } else {
            self.consecutive_empty_scans = 0;
            self.comments_seen += fresh as u64;
        }
    }

    /// Record a scan attempt that failed at the browser level.
    pub fn record_failure(&mut self) {
        self.total_scans += 1;
        self.total_failures += 1;
        self.last_scan_at = Some(Utc::now());
        self.consecutive_failures += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_zeroed() {
        let state = ScanState::new();
        assert_eq!(state.consecutive_empty_scans, 0);
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.total_scans, 0);
        assert!(state.last_scan_at.is_none());
    }

    #[test]
    fn test_empty_scans_accumulate() {
        let mut state = ScanState::new();
        state.record_scan(0);
        state.record_scan(0);
        assert_eq!(state.consecutive_empty_scans, 2);
        assert_eq!(state.total_scans, 2);
        assert_eq!(state.comments_seen, 0);
    }

    #[test]
    fn test_fresh_comments_reset_empty_streak() {
        let mut state = ScanState::new();
        state.record_scan(0);
        state.record_scan(0);
        state.record_scan(3);
        assert_eq!(state.consecutive_empty_scans, 0);
        assert_eq!(state.comments_seen, 3);
    }

    #[test]
    fn test_success_resets_failure_streak() {
        let mut state = ScanState::new();
        state.record_failure();
        state.record_failure();
        assert_eq!(state.consecutive_failures, 2);
        assert_eq!(state.total_failures, 2);

        state.record_scan(0);
        assert_eq!(state.consecutive_failures, 0);
        // An empty successful scan still counts toward the empty streak
        assert_eq!(state.consecutive_empty_scans, 1);
    }

    #[test]
    fn test_record_sets_last_scan_at() {
        let mut state = ScanState::new();
        state.record_failure();
        assert!(state.last_scan_at.is_some());
    }
}
