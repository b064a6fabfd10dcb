//! Search API configuration.

use serde::{Deserialize, Serialize};

/// Remote search API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search endpoint URL. Query parameters are appended to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Page size requested from the API. The server may clamp it.
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Pause between consecutive page requests (milliseconds).
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,

    /// Retry policy for failed page requests.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_base_url() -> String {
    "https://api.mercadolibre.com/sites/MLA/search".to_string()
}

fn default_page_size() -> u64 {
    200
}

fn default_page_delay() -> u64 {
    500
}

fn default_timeout() -> u32 {
    30
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay(),
            timeout_secs: default_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

/// Backoff settings for a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Delay before the first retry (milliseconds).
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay (milliseconds).
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Growth factor applied per retry.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Attempts per page, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Randomize each delay within `[delay/2, delay]`.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_initial_delay() -> u64 {
    5000 // 5 seconds
}

fn default_max_delay() -> u64 {
    300_000 // 5 minutes
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_attempts() -> u32 {
    8
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
            max_attempts: default_max_attempts(),
            jitter: default_jitter(),
        }
    }
}
