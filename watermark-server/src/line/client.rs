//! LINE content-delivery client.
//!
//! Fetches the binary body of a message (`GET /v2/bot/message/{id}/content`)
//! with the channel access token as bearer credential. No retries and no
//! caching: every call is a fresh round-trip.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::{header::AUTHORIZATION, Client};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

/// Boxed error cause carried by [`ContentFetchError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Raw image bytes as they arrive from the content host.
///
/// The caller owns the stream and must drain it.
pub type ContentStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Retrieving message content failed.
///
/// Network, TLS, timeout and non-2xx responses are not distinguished.
#[derive(Debug, Error)]
#[error("failed to get message content: {source}")]
pub struct ContentFetchError {
    #[source]
    source: BoxError,
}

impl ContentFetchError {
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Name used at the client layer.
pub type GetMessageContentError = ContentFetchError;

/// Source of message content.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Open the content stream for `message_id`.
    async fn fetch_content(&self, message_id: &str) -> Result<ContentStream, ContentFetchError>;
}

/// [`ContentFetcher`] backed by the LINE content-delivery API.
#[derive(Clone)]
pub struct LineContentClient {
    client: Client,
    base_url: Url,
    channel_access_token: String,
}

impl LineContentClient {
    /// Create a client for `base_url` (e.g. `https://api-data.line.me`).
    pub fn new(
        base_url: &str,
        channel_access_token: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("content base url cannot be a base: {}", base_url);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            channel_access_token,
        })
    }

    /// Content URL for a message, with the id encoded as one path segment.
    pub fn content_url(&self, message_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v2", "bot", "message", message_id, "content"]);
        }
        url
    }
}

#[async_trait]
impl ContentFetcher for LineContentClient {
    async fn fetch_content(&self, message_id: &str) -> Result<ContentStream, ContentFetchError> {
        let url = self.content_url(message_id);

        info!(message_id = %message_id, "line_content_fetch_starting");

        let response = self
            .client
            .get(url)
            .header(
                AUTHORIZATION,
                format!("Bearer {}", self.channel_access_token),
            )
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| {
                error!(
                    message_id = %message_id,
                    status_code = ?e.status().map(|s| s.as_u16()),
                    is_timeout = e.is_timeout(),
                    error = %e,
                    "line_content_fetch_failed"
                );
                ContentFetchError::new(e)
            })?;

        info!(
            message_id = %message_id,
            status_code = response.status().as_u16(),
            content_length = ?response.content_length(),
            "line_content_fetch_complete"
        );

        Ok(response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(base_url: &str) -> LineContentClient {
        LineContentClient::new(base_url, "test-token".to_string(), Duration::from_secs(5)).unwrap()
    }

    async fn drain(mut stream: ContentStream) -> Vec<u8> {
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk.unwrap());
        }
        body
    }

    #[test]
    fn test_content_url() {
        let client = client_for("https://api-data.line.me");
        assert_eq!(
            client.content_url("12345").as_str(),
            "https://api-data.line.me/v2/bot/message/12345/content"
        );
    }

    #[test]
    fn test_content_url_encodes_message_id() {
        let client = client_for("https://api-data.line.me/");
        assert_eq!(
            client.content_url("a/b").as_str(),
            "https://api-data.line.me/v2/bot/message/a%2Fb/content"
        );
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(LineContentClient::new("not a url", String::new(), Duration::from_secs(1)).is_err());
        assert!(
            LineContentClient::new("mailto:bot@example.com", String::new(), Duration::from_secs(1))
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_fetch_content_sends_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/bot/message/m1/content")
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_header("content-type", "image/jpeg")
            .with_body([0xFFu8, 0xD8, 0xFF, 0xE0])
            .create_async()
            .await;

        let client = client_for(&server.url());
        let stream = client.fetch_content("m1").await.unwrap();

        assert_eq!(drain(stream).await, vec![0xFF, 0xD8, 0xFF, 0xE0]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_content_non_success_status_fails() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/bot/message/gone/content")
            .with_status(404)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let result = client.fetch_content("gone").await;

        assert!(result.is_err());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_content_connection_refused_fails() {
        // Port 9 (discard) is not expected to accept HTTP connections.
        let client = client_for("http://127.0.0.1:9");
        assert!(client.fetch_content("m1").await.is_err());
    }
}
