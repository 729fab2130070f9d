//! Channel scrape orchestration
//!
//! The `ChannelScraper` composes the rate limiter, the pagination cursor and
//! the append store into one retrying scrape loop: obtain page parameters,
//! execute the fetch through the governed retry wrapper, hand the page back
//! for filtering and cursor advancement, append what was kept, repeat until
//! the feed exhausts or a cap is hit.
//!
//! Each run moves through `Init → Authenticating → Validating → Fetching →
//! Done | Failed`. `Failed` is reachable from any phase and still returns the
//! partial result accumulated so far — partial progress is valuable.

use crate::auth::CredentialProvider;
use crate::client::{HttpChatClient, MessageSource};
use crate::config::Config;
use crate::error::Result;
use crate::export::{CsvStore, StorageStats};
use crate::pagination::{PaginationState, apply_cap, filter_by_range, truncate_at_watermark};
use crate::rate_limit::RateLimiter;
use crate::retry::fetch_with_retry;
use crate::types::{MessageId, ScrapeOptions, ScrapeResult};
use crate::watermark::{Watermark, WatermarkStore};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

/// Run phase, logged on every transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Init,
    Authenticating,
    Validating,
    Fetching,
    Done,
    Failed,
}

fn enter_phase(channel_ref: &str, phase: Phase) {
    tracing::debug!(channel = channel_ref, phase = ?phase, "phase transition");
}

/// Scrapes one channel's full history into its export artifact
///
/// Owns the scrape loop and every piece of per-run state; a single scrape is
/// strictly sequential because the cursor for page N+1 depends on the last
/// message id of page N. Run at most one scrape per channel artifact at a
/// time — concurrent scrapes against the same output would race on append
/// order.
pub struct ChannelScraper<S: MessageSource> {
    source: S,
    credentials: Arc<dyn CredentialProvider>,
    store: CsvStore,
    watermarks: WatermarkStore,
    limiter: RateLimiter,
    config: Config,
}

impl ChannelScraper<HttpChatClient> {
    /// Build a scraper backed by the HTTP client for the configured API
    pub fn new(config: Config, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        let source = HttpChatClient::new(&config.api, credentials.clone())?;
        Ok(Self::with_source(source, config, credentials))
    }
}

impl<S: MessageSource> ChannelScraper<S> {
    /// Build a scraper over any message source (in-memory feeds in tests)
    pub fn with_source(
        source: S,
        config: Config,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let limiter = RateLimiter::new(config.rate_limit.clone());
        let store = CsvStore::new(&config.export);
        let watermarks = WatermarkStore::new(&config.export);
        Self {
            source,
            credentials,
            store,
            watermarks,
            limiter,
            config,
        }
    }

    /// Scrape a channel's history into its export artifact
    ///
    /// Always returns a [`ScrapeResult`]: a failed run reports however many
    /// messages were fetched and appended before the failure plus a
    /// non-empty error list. Callers must treat a non-empty error list as
    /// "the run did not fully succeed" even when some output was written.
    pub async fn scrape(
        &self,
        server_ref: &str,
        channel_ref: &str,
        options: ScrapeOptions,
    ) -> ScrapeResult {
        let started = Instant::now();
        let mut result = ScrapeResult::default();

        enter_phase(channel_ref, Phase::Init);
        tracing::info!(
            server = server_ref,
            channel = channel_ref,
            max_messages = options.max_messages,
            "starting channel scrape"
        );

        match self.run(server_ref, channel_ref, &options, &mut result).await {
            Ok(()) => enter_phase(channel_ref, Phase::Done),
            Err(e) => {
                enter_phase(channel_ref, Phase::Failed);
                tracing::error!(channel = channel_ref, error = %e, "scrape run failed");
                result.errors.push(e.to_string());
            }
        }

        result.duration = started.elapsed();
        tracing::info!(
            channel = channel_ref,
            total_scraped = result.total_scraped,
            total_appended = result.total_appended,
            errors = result.errors.len(),
            duration_ms = result.duration.as_millis() as u64,
            "scrape finished"
        );
        result
    }

    /// Storage diagnostics for a channel's artifact
    pub async fn stats(&self, channel_id: &str) -> Result<StorageStats> {
        self.store.stats(channel_id).await
    }

    async fn run(
        &self,
        server_ref: &str,
        channel_ref: &str,
        options: &ScrapeOptions,
        result: &mut ScrapeResult,
    ) -> Result<()> {
        if options.cancel.is_cancelled() {
            result.warnings.push("scrape cancelled".to_string());
            return Ok(());
        }

        enter_phase(channel_ref, Phase::Authenticating);
        // Fail fast before touching the network when no credential exists
        self.credentials.credential().await?;

        enter_phase(channel_ref, Phase::Validating);
        self.source.validate_access(channel_ref).await?;
        let metadata = self.source.resolve_channel(server_ref, channel_ref).await?;

        let mut handle = self.store.initialize(&metadata).await?;
        let watermark = if self.config.fetch.resume_from_watermark {
            self.watermarks.load(&metadata.channel_id).await
        } else {
            None
        };
        if let Some(mark) = &watermark {
            tracing::info!(
                channel = %metadata.channel_id,
                newest_id = mark.newest_id.get(),
                "resuming above previous high-water mark"
            );
        }

        enter_phase(channel_ref, Phase::Fetching);
        let mut state = PaginationState::new();
        let mut newest_seen: Option<MessageId> = None;
        // True once the walk covered its whole range (feed drained or the
        // previous mark reached); only then may the watermark advance
        let mut covered = false;

        while !state.exhausted {
            if options.cancel.is_cancelled() {
                result.warnings.push("scrape cancelled".to_string());
                return Ok(());
            }

            let params = state.next_page_params(self.config.fetch.page_limit);
            let page = fetch_with_retry(&self.limiter, &self.config.retry, || {
                self.source.fetch_page(&metadata.channel_id, params)
            })
            .await?;

            state.advance(&page, params.limit);
            result.total_scraped = state.total_fetched;

            if page.is_empty() {
                covered = true;
                break;
            }
            if newest_seen.is_none() {
                newest_seen = page.first().map(|m| m.id);
            }
            if state.exhausted {
                covered = true;
            }

            let (page, reached_mark) = match &watermark {
                Some(mark) => truncate_at_watermark(page, mark.newest_id),
                None => (page, false),
            };
            let mut kept = filter_by_range(page, options.start, options.end);
            let cap_reached =
                apply_cap(&mut kept, result.messages.len() as u64, options.max_messages);

            if !kept.is_empty() {
                let outcome = self.store.append_batch(&mut handle, &metadata, &kept).await?;
                result.total_appended += outcome.appended;
                result.errors.extend(outcome.errors);
                result.messages.extend(kept);
            }

            if reached_mark {
                tracing::info!(
                    channel = %metadata.channel_id,
                    "reached previous high-water mark, stopping walk"
                );
                covered = true;
                state.mark_exhausted();
            }
            if cap_reached {
                tracing::info!(
                    max_messages = options.max_messages,
                    kept = result.messages.len(),
                    "kept-message cap reached, stopping walk"
                );
                state.mark_exhausted();
            }

            if !state.exhausted {
                tokio::select! {
                    () = tokio::time::sleep(self.config.fetch.page_delay) => {}
                    () = options.cancel.cancelled() => {
                        result.warnings.push("scrape cancelled".to_string());
                        return Ok(());
                    }
                }
            }
        }

        if covered && result.errors.is_empty() {
            if let Some(newest_id) = newest_seen {
                let mark = Watermark {
                    channel_id: metadata.channel_id.clone(),
                    newest_id,
                    updated_at: Utc::now(),
                };
                if let Err(e) = self.watermarks.save(&mark).await {
                    result
                        .warnings
                        .push(format!("could not persist high-water mark: {e}"));
                }
            }
        }

        Ok(())
    }
}
