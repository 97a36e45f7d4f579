//! Per-author and global reply counters used by the rate limiter
//!
//! Window rollover is lazy: counters reset at read time when the current
//! time has passed `window_start + window_len`. No background timer exists.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Per-author reply counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub author_id: String,
    pub author_name: String,
    /// Replies ever sent to this author
    pub reply_count_total: u64,
    /// Replies sent within the current window
    pub reply_count_window: u64,
    pub window_start: DateTime<Utc>,
    /// When we last replied to this author (drives the cooldown check)
    pub last_reply_at: Option<DateTime<Utc>>,
    pub first_reply_at: DateTime<Utc>,
}

impl UserStats {
    pub fn new(author_id: impl Into<String>, author_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            author_id: author_id.into(),
            author_name: author_name.into(),
            reply_count_total: 0,
            reply_count_window: 0,
            window_start: now,
            last_reply_at: None,
            first_reply_at: now,
        }
    }

    /// Reset the window counter if the window has elapsed.
    pub fn roll_window(&mut self, now: DateTime<Utc>, window_len: Duration) {
        if now >= self.window_start + window_len {
            self.window_start = now;
            self.reply_count_window = 0;
        }
    }

    /// Count a confirmed reply to this author.
    pub fn record_reply(&mut self, now: DateTime<Utc>) {
        self.reply_count_total += 1;
        self.reply_count_window += 1;
        self.last_reply_at = Some(now);
    }
}

/// Global reply counter, same lazy-reset invariant as UserStats but scoped to
/// the whole bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateWindow {
    pub reply_count_window: u64,
    pub window_start: DateTime<Utc>,
}

impl RateWindow {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            reply_count_window: 0,
            window_start: now,
        }
    }

    pub fn roll_window(&mut self, now: DateTime<Utc>, window_len: Duration) {
        if now >= self.window_start + window_len {
            self.window_start = now;
            self.reply_count_window = 0;
        }
    }

    pub fn record_reply(&mut self) {
        self.reply_count_window += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_stats_record_reply() {
        let now = Utc::now();
        let mut stats = UserStats::new("u1", "Alice", now);
        stats.record_reply(now);
        stats.record_reply(now);
        assert_eq!(stats.reply_count_total, 2);
        assert_eq!(stats.reply_count_window, 2);
        assert_eq!(stats.last_reply_at, Some(now));
    }

    #[test]
    fn test_user_stats_roll_window_resets_only_window_count() {
        let now = Utc::now();
        let mut stats = UserStats::new("u1", "Alice", now);
        stats.record_reply(now);

        let later = now + Duration::seconds(301);
        stats.roll_window(later, Duration::seconds(300));

        assert_eq!(stats.reply_count_window, 0);
        assert_eq!(stats.reply_count_total, 1);
        assert_eq!(stats.window_start, later);
    }

    #[test]
    fn test_user_stats_roll_window_noop_within_window() {
        let now = Utc::now();
        let mut stats = UserStats::new("u1", "Alice", now);
        stats.record_reply(now);

        let later = now + Duration::seconds(100);
        stats.roll_window(later, Duration::seconds(300));

        assert_eq!(stats.reply_count_window, 1);
        assert_eq!(stats.window_start, now);
    }

    #[test]
    fn test_rate_window_roll() {
        let now = Utc::now();
        let mut window = RateWindow::new(now);
        window.record_reply();
        window.record_reply();
        assert_eq!(window.reply_count_window, 2);

        window.roll_window(now + Duration::seconds(600), Duration::seconds(300));
        assert_eq!(window.reply_count_window, 0);
    }

    #[test]
    fn test_stats_serialization_roundtrip() {
        let now = Utc::now();
        let mut stats = UserStats::new("u1", "Alice", now);
        stats.record_reply(now);
        let json = serde_json::to_string(&stats).unwrap();
        let restored: UserStats = serde_json::from_str(&json).unwrap();
        assert_eq!(stats, restored);
    }
}
