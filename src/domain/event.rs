//! Append-only operator event log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event detail text cap, mirrors the record text cap.
const MAX_DETAIL: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Info,
    Warning,
    Critical,
}

/// A single entry in the durable event log. Events record operator-relevant
/// lifecycle moments (startup, shutdown, escalating scan failures, session
/// death), never per-comment outcomes - those live in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_type: String,
    pub detail: String,
    pub level: EventLevel,
    pub timestamp: DateTime<Utc>,
}

impl EventRecord {
    pub fn new(event_type: impl Into<String>, detail: impl Into<String>, level: EventLevel) -> Self {
        let detail: String = detail.into();
        let detail = if detail.chars().count() > MAX_DETAIL {
            detail.chars().take(MAX_DETAIL).collect()
        } else {
            detail
        };
        Self {
            event_type: event_type.into(),
            detail,
            level,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_new() {
        let event = EventRecord::new("bot_startup", "monitor started", EventLevel::Info);
        assert_eq!(event.event_type, "bot_startup");
        assert_eq!(event.level, EventLevel::Info);
    }

    #[test]
    fn test_event_detail_truncated() {
        let event = EventRecord::new("scan_failures", "x".repeat(5000), EventLevel::Warning);
        assert_eq!(event.detail.chars().count(), 2000);
    }

    #[test]
    fn test_level_serialization() {
        let json = serde_json::to_string(&EventLevel::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }
}
