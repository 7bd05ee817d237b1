use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where posts are harvested from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// WordPress REST root, e.g. `https://example.org/wp-json/wp/v2`.
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Skip TLS certificate verification. Off unless explicitly enabled; some
    /// target sites serve broken chains and the harvest has to run anyway.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_page_size() -> u32 {
    20
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl SourceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout_secs: default_request_timeout_secs(),
            accept_invalid_certs: false,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Harvest loop limits and the minimum-yield gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Stop once this many records are gathered. `None` runs to end of data.
    #[serde(default)]
    pub target_count: Option<usize>,
    #[serde(default = "default_min_records")]
    pub min_records: usize,
    /// Consecutive blocked attempts allowed on a single page.
    #[serde(default = "default_max_block_retries")]
    pub max_block_retries: u32,
    #[serde(default = "default_max_body_chars")]
    pub max_body_chars: usize,
}

fn default_min_records() -> usize {
    50
}

fn default_max_block_retries() -> u32 {
    5
}

fn default_max_body_chars() -> usize {
    crate::normalize::MAX_BODY_CHARS
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            target_count: None,
            min_records: default_min_records(),
            max_block_retries: default_max_block_retries(),
            max_body_chars: default_max_body_chars(),
        }
    }
}

/// Durations for every pause a run takes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_blocked_cooldown_ms")]
    pub blocked_cooldown_ms: u64,
    #[serde(default = "default_network_backoff_ms")]
    pub network_backoff_ms: u64,
}

fn default_min_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    3_000
}

fn default_blocked_cooldown_ms() -> u64 {
    10_000
}

fn default_network_backoff_ms() -> u64 {
    5_000
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            blocked_cooldown_ms: default_blocked_cooldown_ms(),
            network_backoff_ms: default_network_backoff_ms(),
        }
    }
}

/// Where and how the snapshot is published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default = "default_publish_path")]
    pub path: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub message_prefix: Option<String>,
}

fn default_publish_path() -> String {
    "knowledge_base.json".to_string()
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            path: default_publish_path(),
            branch: None,
            api_base: default_api_base(),
            message_prefix: None,
        }
    }
}

/// Local copy of the snapshot for downstream consumers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub local_path: Option<PathBuf>,
}

/// Everything a run needs apart from secrets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    pub fn trace_loaded(&self) {
        info!(
            base_url = %self.source.base_url,
            page_size = self.harvest.page_size,
            target_count = ?self.harvest.target_count,
            min_records = self.harvest.min_records,
            publish_path = %self.publish.path,
            "Loaded Config"
        );
        if self.source.accept_invalid_certs {
            warn!(
                base_url = %self.source.base_url,
                "TLS certificate verification is DISABLED for the content source"
            );
        }
        debug!(?self, "Config loaded (full debug)");
    }
}
