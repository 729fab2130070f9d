//! # chatlog-dl
//!
//! Backend library for exporting the complete message history of a remote
//! chat channel through a paginated, rate-limited HTTP API.
//!
//! ## Design Philosophy
//!
//! chatlog-dl is designed to be:
//! - **Polite by construction** - a sliding-window rate limiter and
//!   exponential backoff keep every run inside the remote API's limits
//! - **Duplicate-free** - append-only CSV artifacts plus a per-channel
//!   high-water mark make repeated runs incremental
//! - **Library-first** - no CLI or UI, purely a Rust crate for embedding
//! - **Partial-progress friendly** - a failed run still returns everything
//!   fetched and appended before the failure
//!
//! ## Quick Start
//!
//! ```no_run
//! use chatlog_dl::{ChannelScraper, Config, EnvCredential, ScrapeOptions};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let credentials = Arc::new(EnvCredential::new("CHAT_API_TOKEN"));
//!
//!     let scraper = ChannelScraper::new(config, credentials)?;
//!     let result = scraper
//!         .scrape("999999999", "111111111", ScrapeOptions::default())
//!         .await;
//!
//!     println!(
//!         "scraped {} messages, appended {} rows in {:?}",
//!         result.total_scraped, result.total_appended, result.duration
//!     );
//!     if !result.is_complete() {
//!         eprintln!("run incomplete: {:?}", result.errors);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Credential acquisition
pub mod auth;
/// HTTP client for the remote chat API
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Append-only CSV persistence
pub mod export;
/// Cursor-based pagination
pub mod pagination;
/// Request rate limiting
pub mod rate_limit;
/// Retry logic for throttled requests
pub mod retry;
/// Scrape orchestration
pub mod scraper;
/// Core types
pub mod types;
/// High-water-mark sidecars
pub mod watermark;

// Re-export commonly used types
pub use auth::{Credential, CredentialProvider, EnvCredential, StaticCredential};
pub use client::{HttpChatClient, MessageSource};
pub use config::{ApiConfig, Config, ExportConfig, FetchConfig, RateLimitConfig, RetryConfig};
pub use error::{Error, Result, StorageError};
pub use export::{AppendOutcome, CsvStore, StorageStats, StoreHandle};
pub use pagination::{PageParams, PaginationState};
pub use rate_limit::RateLimiter;
pub use scraper::ChannelScraper;
pub use types::{
    ChannelMetadata, Message, MessageId, ScrapeOptions, ScrapeResult, parse_timestamp,
};
pub use watermark::{Watermark, WatermarkStore};
