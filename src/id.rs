//! ID and timestamp utilities for replyr

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

/// Generate a unique event ID
///
/// Format: `evt-{timestamp_ms}-{random_hex}`
/// Example: `evt-1738300800123-a1b2`
pub fn generate_event_id() -> String {
    let timestamp = now_ms();
    let random: u16 = rand::rng().random();
    format!("evt-{}-{:04x}", timestamp, random)
}
