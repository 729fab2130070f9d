//! Basic export example
//!
//! This example demonstrates the core functionality of chatlog-dl:
//! - Configuring the remote API and export directory
//! - Supplying a credential from the environment
//! - Scraping a channel's full history with a time window
//! - Inspecting the result and the on-disk artifact

use chatlog_dl::config::{Config, ExportConfig};
use chatlog_dl::{ChannelScraper, EnvCredential, ScrapeOptions, parse_timestamp};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let server_id = std::env::args().nth(1).unwrap_or_else(|| "999999999".to_string());
    let channel_id = std::env::args().nth(2).unwrap_or_else(|| "111111111".to_string());

    // Build configuration
    let config = Config {
        export: ExportConfig {
            output_dir: "exports".into(),
            ..Default::default()
        },
        ..Default::default()
    };

    // Credential comes from the environment; the run fails fast without it
    let credentials = Arc::new(EnvCredential::new("CHAT_API_TOKEN"));

    let scraper = ChannelScraper::new(config, credentials)?;

    // Keep everything from March 2024 onward; bare dates parse to midnight
    let options = ScrapeOptions {
        max_messages: 0,
        start: Some(parse_timestamp("2024-03-01")?),
        ..ScrapeOptions::default()
    };

    let result = scraper.scrape(&server_id, &channel_id, options).await;

    println!(
        "scraped {} messages, appended {} rows in {:?}",
        result.total_scraped, result.total_appended, result.duration
    );
    for warning in &result.warnings {
        println!("⚠ {warning}");
    }
    if !result.is_complete() {
        eprintln!("run incomplete:");
        for error in &result.errors {
            eprintln!("  ✗ {error}");
        }
    }

    let stats = scraper.stats(&channel_id).await?;
    println!(
        "artifact {} now holds {} rows ({} bytes)",
        stats.path.display(),
        stats.row_count,
        stats.size_bytes
    );

    Ok(())
}
