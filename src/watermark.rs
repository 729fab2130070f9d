//! High-water-mark sidecar bounding repeat runs
//!
//! The output artifact alone cannot tell a fresh run which messages are
//! already stored, so each channel gets a small JSON sidecar recording the
//! newest message id confirmed persisted. A later run walks newest-first and
//! stops when it reaches that id instead of re-appending history.
//!
//! The sidecar advances only after a run that covered its whole range
//! (feed exhausted or previous mark reached) with no errors; a partial run
//! leaves the old mark so the next run re-covers the gap.

use crate::config::ExportConfig;
use crate::error::{Result, StorageError};
use crate::types::MessageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Newest persisted message id for one channel
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    /// Channel the mark belongs to
    pub channel_id: String,
    /// Newest message id confirmed appended to the artifact
    pub newest_id: MessageId,
    /// When the mark was written
    pub updated_at: DateTime<Utc>,
}

/// Loads and saves per-channel watermark sidecars
pub struct WatermarkStore {
    dir: PathBuf,
}

impl WatermarkStore {
    /// Store sidecars next to the export artifacts
    #[must_use]
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            dir: config.output_dir.clone(),
        }
    }

    /// Sidecar path for a channel
    #[must_use]
    pub fn sidecar_path(&self, channel_id: &str) -> PathBuf {
        self.dir.join(format!("{channel_id}.watermark.json"))
    }

    /// Load the watermark for a channel, if one was ever written
    ///
    /// A missing sidecar is not an error. An unreadable or corrupt sidecar is
    /// logged and treated as absent — the run then re-walks from the newest
    /// message, which at worst re-appends rows it would otherwise have
    /// skipped.
    pub async fn load(&self, channel_id: &str) -> Option<Watermark> {
        let path = self.sidecar_path(channel_id);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read watermark sidecar");
                return None;
            }
        };

        match serde_json::from_str::<Watermark>(&content) {
            Ok(watermark) => Some(watermark),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt watermark sidecar");
                None
            }
        }
    }

    /// Persist a watermark, replacing any previous one atomically
    pub async fn save(&self, watermark: &Watermark) -> Result<()> {
        let path = self.sidecar_path(&watermark.channel_id);
        let tmp = path.with_extension("json.tmp");

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::CreateFailed {
                path: self.dir.clone(),
                reason: e.to_string(),
            })?;

        let content = serde_json::to_string_pretty(watermark)?;
        fs::write(&tmp, content)
            .await
            .map_err(|e| StorageError::CreateFailed {
                path: tmp.clone(),
                reason: e.to_string(),
            })?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::CreateFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(
            channel_id = %watermark.channel_id,
            newest_id = watermark.newest_id.get(),
            "watermark advanced"
        );
        Ok(())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> WatermarkStore {
        WatermarkStore::new(&ExportConfig {
            output_dir: dir.path().to_path_buf(),
            batch_size: 100,
        })
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mark = Watermark {
            channel_id: "222".to_string(),
            newest_id: MessageId::new(123456),
            updated_at: Utc::now(),
        };

        store.save(&mark).await.unwrap();
        let loaded = store.load("222").await.unwrap();

        assert_eq!(loaded.channel_id, mark.channel_id);
        assert_eq!(loaded.newest_id, mark.newest_id);
    }

    #[tokio::test]
    async fn missing_sidecar_loads_as_none() {
        let dir = TempDir::new().unwrap();
        assert!(store_in(&dir).load("nope").await.is_none());
    }

    #[tokio::test]
    async fn corrupt_sidecar_is_ignored() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.sidecar_path("222"), "{not json").unwrap();

        assert!(store.load("222").await.is_none());
    }

    #[tokio::test]
    async fn save_replaces_previous_mark() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        for id in [10, 20] {
            store
                .save(&Watermark {
                    channel_id: "222".to_string(),
                    newest_id: MessageId::new(id),
                    updated_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        assert_eq!(store.load("222").await.unwrap().newest_id, MessageId::new(20));
    }
}
