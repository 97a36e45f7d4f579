//! YAML configuration with sensible defaults for every field
//!
//! Resolution order: an explicit `--config` path, then `.replyr.yml` in the
//! working directory, then `~/.config/replyr/replyr.yml`, then built-in
//! defaults. Every section is optional; a missing file is not an error but a
//! file that exists and fails to parse is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::browser::RemoteDriverConfig;
use crate::completion::OpenAiConfig;
use crate::composer::{ComposerConfig, ReplyLimits};
use crate::limiter::RateLimitConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::retry::RetryPolicy;
use crate::scheduler::SchedulerConfig;

const CONFIG_FILENAME: &str = "replyr.yml";
const LOCAL_CONFIG: &str = ".replyr.yml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// URL of the post being monitored, recorded for logs and status output
    #[serde(default)]
    pub post_url: Option<String>,
    /// Display name the bot posts under
    #[serde(default)]
    pub our_name: Option<String>,
    /// Directory for the JSONL store (defaults to the platform data dir)
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
    /// Stop after this many scan cycles (unset runs until interrupted)
    #[serde(default)]
    pub max_cycles: Option<u64>,
    /// Stop after this many replies in one session (unset means no cap)
    #[serde(default)]
    pub max_replies: Option<u64>,

    #[serde(default)]
    pub rate_limit: RateLimitSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub scan: ScanSection,
    #[serde(default)]
    pub completion: CompletionSection,
    #[serde(default)]
    pub filter: FilterSection,
    #[serde(default)]
    pub browser: BrowserSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RateLimitSection {
    #[serde(default = "default_max_replies_per_user")]
    pub max_replies_per_user: u64,
    #[serde(default = "default_max_replies_per_window")]
    pub max_replies_per_window: u64,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default)]
    pub cooldown_secs: u64,
}

fn default_max_replies_per_user() -> u64 {
    3
}

fn default_max_replies_per_window() -> u64 {
    8
}

fn default_window_secs() -> u64 {
    300
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            max_replies_per_user: default_max_replies_per_user(),
            max_replies_per_window: default_max_replies_per_window(),
            window_secs: default_window_secs(),
            cooldown_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_factor: default_backoff_factor(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ScanSection {
    #[serde(default = "default_base_interval_secs")]
    pub base_interval_secs: u64,
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,
    #[serde(default = "default_max_interval_secs")]
    pub max_interval_secs: u64,
    #[serde(default = "default_empty_scan_factor")]
    pub empty_scan_factor: f64,
    #[serde(default = "default_failure_factor")]
    pub failure_factor: f64,
    #[serde(default = "default_jitter")]
    pub jitter: f64,
    #[serde(default = "default_failure_alert_threshold")]
    pub failure_alert_threshold: u32,
}

fn default_base_interval_secs() -> u64 {
    15
}

fn default_min_interval_secs() -> u64 {
    5
}

fn default_max_interval_secs() -> u64 {
    60
}

fn default_empty_scan_factor() -> f64 {
    1.5
}

fn default_failure_factor() -> f64 {
    2.0
}

fn default_jitter() -> f64 {
    0.1
}

fn default_failure_alert_threshold() -> u32 {
    3
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            base_interval_secs: default_base_interval_secs(),
            min_interval_secs: default_min_interval_secs(),
            max_interval_secs: default_max_interval_secs(),
            empty_scan_factor: default_empty_scan_factor(),
            failure_factor: default_failure_factor(),
            jitter: default_jitter(),
            failure_alert_threshold: default_failure_alert_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CompletionSection {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra persona/style text appended to the system prompt
    #[serde(default)]
    pub persona: Option<String>,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.8
}

fn default_max_tokens() -> u32 {
    150
}

fn default_completion_timeout_secs() -> u64 {
    60
}

impl Default for CompletionSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_completion_timeout_secs(),
            persona: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FilterSection {
    /// Write ledger records for ineligible comments (own posts, too short)
    #[serde(default = "default_true")]
    pub record_ineligible_skips: bool,
    #[serde(default = "default_max_reply_chars")]
    pub max_reply_chars: usize,
    /// Lowercased substrings that disqualify a generated reply
    #[serde(default)]
    pub disallowed_terms: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_max_reply_chars() -> usize {
    400
}

impl Default for FilterSection {
    fn default() -> Self {
        Self {
            record_ineligible_skips: true,
            max_reply_chars: default_max_reply_chars(),
            disallowed_terms: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BrowserSection {
    #[serde(default = "default_browser_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_browser_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_browser_endpoint() -> String {
    "http://127.0.0.1:4444".to_string()
}

fn default_browser_timeout_secs() -> u64 {
    30
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            endpoint: default_browser_endpoint(),
            timeout_secs: default_browser_timeout_secs(),
        }
    }
}

impl Config {
    /// Load from the first config file found, or defaults when none exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            log::info!("loading config from {}", path.display());
            return Self::from_file(path);
        }

        let local = PathBuf::from(LOCAL_CONFIG);
        if local.exists() {
            log::info!("loading config from {}", local.display());
            return Self::from_file(&local);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("replyr").join(CONFIG_FILENAME);
            if path.exists() {
                log::info!("loading config from {}", path.display());
                return Self::from_file(&path);
            }
        }

        log::info!("no config file found, using defaults");
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .wrap_err_with(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.window_secs == 0 {
            eyre::bail!("rate-limit.window-secs must be greater than zero");
        }
        if self.rate_limit.max_replies_per_user == 0 {
            eyre::bail!("rate-limit.max-replies-per-user must be greater than zero");
        }
        if self.retry.backoff_factor < 1.0 {
            eyre::bail!("retry.backoff-factor must be at least 1.0");
        }
        if self.scan.base_interval_secs == 0 {
            eyre::bail!("scan.base-interval-secs must be greater than zero");
        }
        if self.scan.min_interval_secs == 0 {
            eyre::bail!("scan.min-interval-secs must be greater than zero");
        }
        if self.scan.min_interval_secs > self.scan.max_interval_secs {
            eyre::bail!("scan.min-interval-secs must not exceed scan.max-interval-secs");
        }
        if !(0.0..1.0).contains(&self.scan.jitter) {
            eyre::bail!("scan.jitter must be in [0.0, 1.0)");
        }
        if self.filter.max_reply_chars < 3 {
            eyre::bail!("filter.max-reply-chars must be at least 3");
        }
        Ok(())
    }

    /// Directory the JSONL store lives in.
    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("replyr")
        })
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_replies_per_user: self.rate_limit.max_replies_per_user,
            max_replies_per_window: self.rate_limit.max_replies_per_window,
            window_secs: self.rate_limit.window_secs,
            cooldown_secs: self.rate_limit.cooldown_secs,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.initial_delay_ms),
            self.retry.backoff_factor,
            Duration::from_millis(self.retry.max_delay_ms),
        )
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            base_interval: Duration::from_secs(self.scan.base_interval_secs),
            min_interval: Duration::from_secs(self.scan.min_interval_secs),
            max_interval: Duration::from_secs(self.scan.max_interval_secs),
            empty_scan_factor: self.scan.empty_scan_factor,
            failure_factor: self.scan.failure_factor,
            jitter: self.scan.jitter,
            failure_alert_threshold: self.scan.failure_alert_threshold,
        }
    }

    pub fn openai_config(&self) -> OpenAiConfig {
        OpenAiConfig {
            model: self.completion.model.clone(),
            temperature: self.completion.temperature,
            max_tokens: self.completion.max_tokens,
            timeout: Duration::from_secs(self.completion.timeout_secs),
        }
    }

    pub fn composer_config(&self) -> ComposerConfig {
        let mut limits = ReplyLimits::default();
        limits.max_chars = self.filter.max_reply_chars;
        limits
            .disallowed_terms
            .extend(self.filter.disallowed_terms.iter().map(|t| t.to_lowercase()));
        ComposerConfig {
            persona: self.completion.persona.clone(),
            limits,
        }
    }

    pub fn browser_config(&self) -> RemoteDriverConfig {
        RemoteDriverConfig {
            endpoint: self.browser.endpoint.clone(),
            timeout: Duration::from_secs(self.browser.timeout_secs),
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            our_name: self.our_name.clone().unwrap_or_default(),
            record_ineligible_skips: self.filter.record_ineligible_skips,
            max_cycles: self.max_cycles,
            max_replies: self.max_replies,
        }
    }
}
