//! Configuration types for chatlog-dl

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// API ceiling on messages per page; requests never exceed this
pub const MAX_PAGE_LIMIT: u8 = 100;

/// Main configuration for the channel scraper
///
/// Fields are organized into logical sub-configs for maintainability:
/// - [`api`](ApiConfig) — remote endpoint, timeout, user agent
/// - [`rate_limit`](RateLimitConfig) — request window size and cap
/// - [`retry`](RetryConfig) — backoff behavior on throttling
/// - [`fetch`](FetchConfig) — page size, inter-page pacing, watermark resume
/// - [`export`](ExportConfig) — output directory and append batching
///
/// All fields have serde defaults, so a `Config` deserialized from an empty
/// document behaves exactly like `Config::default()`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Request rate limiting settings
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Retry behavior for throttled requests
    #[serde(default)]
    pub retry: RetryConfig,

    /// Pagination and pacing settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Export artifact settings
    #[serde(default)]
    pub export: ExportConfig,
}

/// Remote API endpoint configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the chat API (default: Discord v10 REST endpoint)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_ms_serde")]
    pub request_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Request rate limiting configuration
///
/// The remote API enforces true per-second windows, so the limiter tracks
/// request timestamps inside a rolling window rather than refilling tokens.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests inside one window (default: 10)
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    /// Window length (default: 1000 ms)
    #[serde(default = "default_window", with = "duration_ms_serde")]
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window: default_window(),
        }
    }
}

/// Retry configuration for throttled requests
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_ms_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_ms_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false, keeping pacing deterministic)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// Pagination and pacing configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Messages requested per page (default and ceiling: 100)
    ///
    /// Values above [`MAX_PAGE_LIMIT`] are clamped when building page
    /// parameters; the API rejects larger pages.
    #[serde(default = "default_page_limit")]
    pub page_limit: u8,

    /// Fixed delay between consecutive page fetches (default: 100 ms)
    ///
    /// Applied in addition to the rate limiter's own pacing, as a
    /// conservative buffer against burst limits.
    #[serde(default = "default_page_delay", with = "duration_ms_serde")]
    pub page_delay: Duration,

    /// Stop paging at the high-water mark persisted by a previous run (default: true)
    #[serde(default = "default_true")]
    pub resume_from_watermark: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_limit: default_page_limit(),
            page_delay: default_page_delay(),
            resume_from_watermark: true,
        }
    }
}

/// Export artifact configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory holding one CSV artifact (and watermark sidecar) per channel
    /// (default: "./exports")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Records appended per write batch (default: 100)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_base_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("chatlog-dl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_requests() -> usize {
    10
}

fn default_window() -> Duration {
    Duration::from_millis(1000)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_page_limit() -> u8 {
    MAX_PAGE_LIMIT
}

fn default_page_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./exports")
}

fn default_batch_size() -> usize {
    100
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (millisecond granularity — several delays
// here are sub-second)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
