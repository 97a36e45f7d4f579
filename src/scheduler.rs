//! Scan Scheduler - adaptive cadence between scans
//!
//! A pure function of ScanState: quiet stretches grow the delay
//! multiplicatively up to a ceiling, browser-level failures grow it with a
//! steeper factor, and any scan that surfaces fresh comments snaps back to
//! the base interval. Jitter keeps the cadence from being fingerprint
//! regular. The scheduler never sleeps; it only returns the duration the
//! orchestrator should.

use std::time::Duration;

use rand::Rng;

use crate::domain::ScanState;

/// Cadence geometry.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Delay after an active scan
    pub base_interval: Duration,
    /// Floor for any returned delay
    pub min_interval: Duration,
    /// Ceiling for any returned delay (before jitter)
    pub max_interval: Duration,
    /// Growth per consecutive empty scan
    pub empty_scan_factor: f64,
    /// Growth per consecutive scan failure
    pub failure_factor: f64,
    /// Relative jitter applied to the final delay (0.0 disables)
    pub jitter: f64,
    /// Consecutive failures at which the orchestrator escalates to the
    /// operator
    pub failure_alert_threshold: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(15),
            min_interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(60),
            empty_scan_factor: 1.5,
            failure_factor: 2.0,
            jitter: 0.1,
            failure_alert_threshold: 3,
        }
    }
}

/// Decides when the next scan should occur.
#[derive(Debug, Clone)]
pub struct ScanScheduler {
    config: SchedulerConfig,
}

impl ScanScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Duration the orchestrator should sleep before the next scan.
    pub fn next_delay(&self, state: &ScanState) -> Duration {
        let base = self.config.base_interval.as_secs_f64();

        // Exponents are capped so the powi result stays finite well past the
        // point the clamp takes over.
        let mut secs = if state.consecutive_failures > 0 {
            base * self.config.failure_factor.powi(state.consecutive_failures.min(16) as i32)
        } else if state.consecutive_empty_scans > 0 {
            base * self.config.empty_scan_factor.powi(state.consecutive_empty_scans.min(16) as i32)
        } else {
            base
        };

        secs = secs.clamp(
            self.config.min_interval.as_secs_f64(),
            self.config.max_interval.as_secs_f64(),
        );

        if self.config.jitter > 0.0 {
            // A zero delay yields an empty jitter range, which random_range
            // rejects with a panic.
            let spread = secs * self.config.jitter;
            if spread > 0.0 {
                secs += rand::rng().random_range(-spread..spread);
                secs = secs.max(self.config.min_interval.as_secs_f64());
            }
        }

        Duration::from_secs_f64(secs)
    }

    /// Whether the failure streak warrants an operator-facing alert.
    pub fn should_alert(&self, state: &ScanState) -> bool {
        state.consecutive_failures >= self.config.failure_alert_threshold
    }
}
