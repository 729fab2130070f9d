//! Append-only CSV persistence for exported messages
//!
//! One artifact per channel, columns
//! `server_name, server_id, channel_name, channel_id, data`, header written
//! exactly once at creation. Repeated runs only ever append rows — the header
//! and existing rows are never rewritten. The full message structure is
//! serialized to JSON and embedded as a single escaped field, so the
//! five-column schema never changes as the payload's internal shape evolves.

use crate::config::ExportConfig;
use crate::error::{Result, StorageError};
use crate::types::{ChannelMetadata, Message};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Fixed header row of every export artifact
pub const CSV_HEADER: &str = "server_name,server_id,channel_name,channel_id,data";

/// Append-only CSV store keyed by channel
pub struct CsvStore {
    output_dir: PathBuf,
    batch_size: usize,
}

/// Open append handle for one channel's artifact
///
/// Owned exclusively by a single scrape invocation; concurrent scrapes
/// against the same artifact must be serialized by the caller.
pub struct StoreHandle {
    path: PathBuf,
    file: tokio::fs::File,
}

impl StoreHandle {
    /// Path of the artifact this handle appends to
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Outcome of one `append_batch` call
#[derive(Debug, Default)]
pub struct AppendOutcome {
    /// Rows successfully appended
    pub appended: u64,
    /// Per-record serialization failures (batch-isolated, run continues)
    pub errors: Vec<String>,
}

/// Read-only diagnostic derived by re-scanning the artifact
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageStats {
    /// Artifact path for the channel
    pub path: PathBuf,
    /// Whether the artifact exists on disk
    pub exists: bool,
    /// Artifact size in bytes
    pub size_bytes: u64,
    /// Data rows in the artifact (line count minus the header line)
    pub row_count: u64,
}

impl CsvStore {
    /// Create a store writing under the configured output directory
    #[must_use]
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            batch_size: config.batch_size.max(1),
        }
    }

    /// Artifact path for a channel
    #[must_use]
    pub fn artifact_path(&self, channel_id: &str) -> PathBuf {
        self.output_dir.join(format!("{channel_id}.csv"))
    }

    /// Open (creating if needed) the artifact for a channel
    ///
    /// Idempotent: a missing artifact is created and gets the fixed header
    /// exactly once; an existing artifact is opened for append with the
    /// header left untouched. An artifact that exists but is empty (a crash
    /// between create and header write) gets the header on the next call.
    pub async fn initialize(&self, metadata: &ChannelMetadata) -> Result<StoreHandle> {
        let path = self.artifact_path(&metadata.channel_id);

        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| StorageError::CreateFailed {
                path: self.output_dir.clone(),
                reason: e.to_string(),
            })?;

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .await
            .map_err(|e| StorageError::CreateFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let len = file
            .metadata()
            .await
            .map_err(|e| StorageError::CreateFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?
            .len();

        if len == 0 {
            let header = format!("{CSV_HEADER}\n");
            file.write_all(header.as_bytes())
                .await
                .map_err(|e| StorageError::CreateFailed {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            file.flush().await.map_err(|e| StorageError::CreateFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            tracing::info!(path = %path.display(), "created export artifact");
        } else {
            tracing::debug!(path = %path.display(), size_bytes = len, "appending to existing artifact");
        }

        Ok(StoreHandle { path, file })
    }

    /// Append messages as export rows, in fixed-size batches
    ///
    /// A record that fails to serialize is recorded in the outcome and does
    /// not block the rest of its batch or later batches. A file-level write
    /// failure aborts with a storage error — persistence failures are not
    /// swallowed.
    pub async fn append_batch(
        &self,
        handle: &mut StoreHandle,
        metadata: &ChannelMetadata,
        messages: &[Message],
    ) -> Result<AppendOutcome> {
        let mut outcome = AppendOutcome::default();

        for batch in messages.chunks(self.batch_size) {
            let mut buffer = String::new();
            for message in batch {
                match serde_json::to_string(&message.raw) {
                    Ok(payload) => {
                        buffer.push_str(&format_row(metadata, &payload));
                        outcome.appended += 1;
                    }
                    Err(e) => {
                        outcome
                            .errors
                            .push(format!("message {}: {e}", message.id));
                    }
                }
            }

            handle
                .file
                .write_all(buffer.as_bytes())
                .await
                .map_err(|e| StorageError::AppendFailed {
                    path: handle.path.clone(),
                    reason: e.to_string(),
                })?;
            handle
                .file
                .flush()
                .await
                .map_err(|e| StorageError::AppendFailed {
                    path: handle.path.clone(),
                    reason: e.to_string(),
                })?;
        }

        if !outcome.errors.is_empty() {
            tracing::warn!(
                skipped = outcome.errors.len(),
                appended = outcome.appended,
                "some records could not be serialized"
            );
        }

        Ok(outcome)
    }

    /// Re-scan a channel's artifact for diagnostics
    ///
    /// Row count is line count minus the header line; a missing artifact
    /// reports zeros.
    pub async fn stats(&self, channel_id: &str) -> Result<StorageStats> {
        let path = self.artifact_path(channel_id);

        let metadata = match fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StorageStats {
                    path,
                    exists: false,
                    size_bytes: 0,
                    row_count: 0,
                });
            }
            Err(e) => {
                return Err(StorageError::ScanFailed {
                    path,
                    reason: e.to_string(),
                }
                .into());
            }
        };

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| StorageError::ScanFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        let lines = content.lines().count() as u64;

        Ok(StorageStats {
            path,
            exists: true,
            size_bytes: metadata.len(),
            row_count: lines.saturating_sub(1),
        })
    }
}

/// Format one export row: the four metadata columns plus the payload blob
fn format_row(metadata: &ChannelMetadata, payload: &str) -> String {
    format!(
        "{},{},{},{},{}\n",
        escape_field(&metadata.server_name),
        escape_field(&metadata.server_id),
        escape_field(&metadata.channel_name),
        escape_field(&metadata.channel_id),
        escape_field(payload),
    )
}

/// Quote a field when it contains the delimiter, the quote, or a newline
///
/// Internal quotes are doubled (RFC 4180); the rule round-trips exactly.
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
