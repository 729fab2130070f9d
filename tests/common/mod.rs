//! Common test utilities for chatlog-dl E2E tests

use chatlog_dl::Config;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Server (guild) id used by every scenario
pub const SERVER_ID: &str = "999000999";
/// Channel id used by every scenario
pub const CHANNEL_ID: &str = "111000111";

/// Timestamp of message `id`: `id` minutes past a fixed epoch
pub fn message_ts(id: u64) -> DateTime<Utc> {
    let epoch = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    epoch + chrono::Duration::minutes(id as i64)
}

/// One feed message object with a payload worth round-tripping
pub fn message_json(id: u64) -> Value {
    json!({
        "id": id.to_string(),
        "timestamp": message_ts(id).to_rfc3339(),
        "content": format!("message {id}, with \"quotes\"\nand a second line"),
        "author": {"id": "42", "username": "tester"},
    })
}

/// A newest-first page covering ids `high..=low`
pub fn page_json(high: u64, low: u64) -> Value {
    Value::Array((low..=high).rev().map(message_json).collect())
}

/// Mount the channel-info and guild-info endpoints every run resolves
pub async fn mount_channel_resolution(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/channels/{CHANNEL_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": CHANNEL_ID,
            "name": "general",
            "guild_id": SERVER_ID,
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/guilds/{SERVER_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": SERVER_ID,
            "name": "Test Guild",
        })))
        .mount(server)
        .await;
}

/// Config pointed at the mock server, exporting into the temp dir
pub fn test_config(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.api.base_url = server.uri();
    config.export.output_dir = dir.path().to_path_buf();
    config.fetch.page_delay = Duration::from_millis(1);
    config
}
