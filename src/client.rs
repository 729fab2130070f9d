//! HTTP client for the remote chat API
//!
//! Implements the feed contract: `GET /channels/{id}/messages?limit=N&before=ID`
//! returns a newest-first JSON array of messages. Non-2xx responses map to the
//! typed error taxonomy by status code — 429 (throttled) is the only
//! retryable outcome, and the classification never inspects message text.

use crate::auth::CredentialProvider;
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::pagination::PageParams;
use crate::types::{ChannelMetadata, Message};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Source of pages and channel metadata for the scrape loop
///
/// The orchestrator only talks to this trait, so tests can drive it with an
/// in-memory feed instead of a network.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Fetch one page of messages, newest-first
    async fn fetch_page(&self, channel_id: &str, params: PageParams) -> Result<Vec<Message>>;

    /// Resolve channel and server identity once per run
    async fn resolve_channel(&self, server_ref: &str, channel_ref: &str)
    -> Result<ChannelMetadata>;

    /// Check that the credential can read the channel before any fetching
    async fn validate_access(&self, channel_ref: &str) -> Result<()>;
}

/// reqwest-backed client for a Discord-compatible chat API
///
/// The credential is pulled from the provider per request, so a provider
/// backed by an external source can rotate tokens without rebuilding the
/// client.
pub struct HttpChatClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl std::fmt::Debug for HttpChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChatClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpChatClient {
    /// Create a client for the configured endpoint
    ///
    /// # Errors
    /// Returns a configuration error when the base URL is invalid, or a
    /// network error when the HTTP client cannot be constructed.
    pub fn new(config: &ApiConfig, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL {:?}: {e}", config.base_url),
            key: Some("api.base_url".to_string()),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config {
                message: format!("base URL {:?} cannot carry path segments", config.base_url),
                key: Some("api.base_url".to_string()),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    /// Build an endpoint URL under the base path
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new(), so path_segments_mut succeeds
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Execute a GET and map non-success statuses to typed errors
    async fn get_json(&self, url: Url) -> Result<serde_json::Value> {
        let credential = self.credentials.credential().await?;
        let response = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, credential.authorization())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<f64>().ok())
            .map(Duration::from_secs_f64);
        let body = response.text().await.unwrap_or_default();

        Err(Error::from_status(status.as_u16(), body, retry_after))
    }
}

#[async_trait]
impl MessageSource for HttpChatClient {
    async fn fetch_page(&self, channel_id: &str, params: PageParams) -> Result<Vec<Message>> {
        let mut url = self.endpoint(&["channels", channel_id, "messages"]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &params.limit.to_string());
            if let Some(before) = params.before {
                query.append_pair("before", &before.to_string());
            }
        }

        tracing::debug!(
            channel_id = channel_id,
            limit = params.limit,
            before = params.before.map(|id| id.get()),
            "fetching page"
        );

        let body = self.get_json(url).await?;
        let raw_items = match body {
            serde_json::Value::Array(items) => items,
            other => {
                return Err(Error::InvalidMessage(format!(
                    "expected a message array, got {}",
                    value_kind(&other)
                )));
            }
        };

        raw_items.into_iter().map(Message::from_value).collect()
    }

    async fn resolve_channel(
        &self,
        server_ref: &str,
        channel_ref: &str,
    ) -> Result<ChannelMetadata> {
        let channel = self.get_json(self.endpoint(&["channels", channel_ref])).await?;
        let channel_name = channel
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or(channel_ref)
            .to_string();
        let server_id = channel
            .get("guild_id")
            .and_then(|v| v.as_str())
            .unwrap_or(server_ref)
            .to_string();

        let server = self.get_json(self.endpoint(&["guilds", &server_id])).await?;
        let server_name = server
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or(&server_id)
            .to_string();

        Ok(ChannelMetadata {
            server_name,
            server_id,
            channel_name,
            channel_id: channel_ref.to_string(),
        })
    }

    async fn validate_access(&self, channel_ref: &str) -> Result<()> {
        self.get_json(self.endpoint(&["channels", channel_ref]))
            .await
            .map(|_| ())
    }
}

fn value_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Credential, StaticCredential};
    use crate::types::MessageId;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider() -> Arc<dyn CredentialProvider> {
        Arc::new(StaticCredential::new(Credential::new("test-token")))
    }

    fn client_for(server: &MockServer) -> HttpChatClient {
        let config = ApiConfig {
            base_url: server.uri(),
            ..ApiConfig::default()
        };
        HttpChatClient::new(&config, provider()).unwrap()
    }

    #[tokio::test]
    async fn fetch_page_parses_messages_and_sends_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/111/messages"))
            .and(query_param("limit", "100"))
            .and(header("authorization", "test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "30", "timestamp": "2024-03-01T00:00:30Z", "content": "newest"},
                {"id": "20", "timestamp": "2024-03-01T00:00:20Z", "content": "older"},
            ])))
            .mount(&server)
            .await;

        let page = client_for(&server)
            .fetch_page("111", PageParams { limit: 100, before: None })
            .await
            .unwrap();

        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, MessageId::new(30));
        assert_eq!(page[1].raw["content"], "older");
    }

    #[tokio::test]
    async fn fetch_page_passes_before_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/111/messages"))
            .and(query_param("before", "500"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let page = client_for(&server)
            .fetch_page(
                "111",
                PageParams {
                    limit: 100,
                    before: Some(MessageId::new(500)),
                },
            )
            .await
            .unwrap();

        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn throttled_response_maps_to_rate_limited_with_hint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "2"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_page("111", PageParams { limit: 100, before: None })
            .await
            .unwrap_err();

        match err {
            Error::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(Duration::from_secs(2)));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn auth_statuses_map_to_typed_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/locked"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/channels/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(matches!(
            client.validate_access("locked").await.unwrap_err(),
            Error::AccessDenied(_)
        ));
        assert!(matches!(
            client.validate_access("missing").await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn resolve_channel_combines_channel_and_guild() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/222"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "222", "name": "general", "guild_id": "999"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/guilds/999"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "999", "name": "My Server"
            })))
            .mount(&server)
            .await;

        let metadata = client_for(&server).resolve_channel("999", "222").await.unwrap();

        assert_eq!(
            metadata,
            ChannelMetadata {
                server_name: "My Server".to_string(),
                server_id: "999".to_string(),
                channel_name: "general".to_string(),
                channel_id: "222".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn non_array_page_body_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"oops": true})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_page("111", PageParams { limit: 100, before: None })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidMessage(_)));
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        let config = ApiConfig {
            base_url: "not a url".to_string(),
            ..ApiConfig::default()
        };
        let err = HttpChatClient::new(&config, provider()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
