//! Rate limiter - reply-frequency ceilings, per author and global
//!
//! `may_reply` checks the per-author cap, the author cooldown, then the
//! global window cap; any hit short-circuits. Counters are incremented only
//! by `record_reply`, after a submission is confirmed, so a reply that fails
//! between the check and the submission never consumes budget. Window
//! rollover is lazy, evaluated at read time; no background timer exists.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::domain::{RateWindow, UserStats};
use crate::error::Result;
use crate::storage::Store;

/// Collection of per-author counters, keyed by author id.
pub const USER_STATS_COLLECTION: &str = "user_stats";
/// Collection holding the single global window record.
pub const RATE_WINDOW_COLLECTION: &str = "rate_window";
const RATE_WINDOW_KEY: &str = "global";

/// Rate limit ceilings and window geometry.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Max replies to one author within a window
    pub max_replies_per_user: u64,
    /// Max replies overall within a window
    pub max_replies_per_window: u64,
    /// Window length in seconds
    pub window_secs: u64,
    /// Minimum gap between consecutive replies to the same author (0 = off)
    pub cooldown_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_replies_per_user: 3,
            max_replies_per_window: 8,
            window_secs: 300,
            cooldown_secs: 0,
        }
    }
}

/// Verdict from a `may_reply` check, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    /// The author reached their per-window cap
    UserCapped,
    /// The author was replied to too recently
    CoolingDown,
    /// The global window reached its cap
    GlobalCapped,
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed)
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Verdict::Allowed => "allowed",
            Verdict::UserCapped => "per-user cap reached",
            Verdict::CoolingDown => "author cooldown active",
            Verdict::GlobalCapped => "global window cap reached",
        }
    }
}

/// Enforces reply-frequency ceilings on top of the store. Owns all writes to
/// UserStats and RateWindow records.
pub struct RateLimiter<S: Store> {
    store: Arc<S>,
    config: RateLimitConfig,
}

impl<S: Store> RateLimiter<S> {
    pub fn new(store: Arc<S>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    fn window_len(&self) -> Duration {
        Duration::seconds(self.config.window_secs as i64)
    }

    fn load_user(&self, author_id: &str) -> Result<Option<UserStats>> {
        match self.store.get(USER_STATS_COLLECTION, author_id)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn load_window(&self, now: DateTime<Utc>) -> Result<RateWindow> {
        match self.store.get(RATE_WINDOW_COLLECTION, RATE_WINDOW_KEY)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(RateWindow::new(now)),
        }
    }

    /// May we reply to this author right now?
    pub fn may_reply(&self, author_id: &str) -> Result<Verdict> {
        self.may_reply_at(author_id, Utc::now())
    }

    /// Same as `may_reply` with an injected clock.
    pub fn may_reply_at(&self, author_id: &str, now: DateTime<Utc>) -> Result<Verdict> {
        if let Some(mut stats) = self.load_user(author_id)? {
            stats.roll_window(now, self.window_len());
            if stats.reply_count_window >= self.config.max_replies_per_user {
                tracing::debug!(
                    author_id = %author_id,
                    count = stats.reply_count_window,
                    cap = self.config.max_replies_per_user,
                    "per-user cap reached"
                );
                return Ok(Verdict::UserCapped);
            }
            if self.config.cooldown_secs > 0 {
                if let Some(last) = stats.last_reply_at {
                    let cooldown = Duration::seconds(self.config.cooldown_secs as i64);
                    if now < last + cooldown {
                        return Ok(Verdict::CoolingDown);
                    }
                }
            }
        }

        let mut window = self.load_window(now)?;
        window.roll_window(now, self.window_len());
        if window.reply_count_window >= self.config.max_replies_per_window {
            tracing::warn!(
                count = window.reply_count_window,
                cap = self.config.max_replies_per_window,
                window_secs = self.config.window_secs,
                "global window cap reached"
            );
            return Ok(Verdict::GlobalCapped);
        }

        Ok(Verdict::Allowed)
    }

    /// Count a confirmed reply against both the author and the global window.
    pub fn record_reply(&self, author_id: &str, author_name: &str) -> Result<()> {
        self.record_reply_at(author_id, author_name, Utc::now())
    }

    /// Same as `record_reply` with an injected clock.
    pub fn record_reply_at(&self, author_id: &str, author_name: &str, now: DateTime<Utc>) -> Result<()> {
        let mut stats = self
            .load_user(author_id)?
            .unwrap_or_else(|| UserStats::new(author_id, author_name, now));
        stats.roll_window(now, self.window_len());
        stats.record_reply(now);
        stats.author_name = author_name.to_string();
        self.store
            .put(USER_STATS_COLLECTION, author_id, &serde_json::to_value(&stats)?)?;

        let mut window = self.load_window(now)?;
        window.roll_window(now, self.window_len());
        window.record_reply();
        self.store
            .put(RATE_WINDOW_COLLECTION, RATE_WINDOW_KEY, &serde_json::to_value(&window)?)?;

        Ok(())
    }

    /// Current window count for one author, for status output.
    pub fn user_window_count(&self, author_id: &str) -> Result<u64> {
        Ok(self.load_user(author_id)?.map(|s| s.reply_count_window).unwrap_or(0))
    }
}
