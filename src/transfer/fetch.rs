//! Single-URL downloads with bounded retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use tokio_util::sync::CancellationToken;

use crate::config::TransferConfig;
use crate::error::TransferFailure;
use crate::media::{derive_filename, NamedBlob};
use crate::transfer::retry::{with_retry, RetryPolicy};

/// Something that can turn a URL into a named blob.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str, cancel: &CancellationToken)
        -> Result<NamedBlob, TransferFailure>;
}

/// HTTP fetcher used by the transfer pipeline.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(client: Client, config: &TransferConfig) -> Self {
        Self {
            client,
            policy: RetryPolicy::new(
                config.fetch_attempts,
                Duration::from_millis(config.fetch_retry_delay_ms),
            ),
            timeout: config.fetch_timeout(),
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<NamedBlob, TransferFailure> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferFailure::status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await?;
        let filename = derive_filename(url, content_type.as_deref());

        tracing::debug!("Fetched {} ({} bytes) as {}", url, bytes.len(), filename);

        Ok(NamedBlob::new(filename, bytes))
    }
}

#[async_trait]
impl Fetch for Fetcher {
    async fn fetch(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<NamedBlob, TransferFailure> {
        with_retry(&self.policy, cancel, url, |_| self.fetch_once(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> Fetcher {
        Fetcher::new(Client::new(), &TransferConfig::default())
    }

    #[tokio::test]
    async fn test_fetch_named_from_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/a.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(b"jpeg-bytes".to_vec()),
            )
            .mount(&server)
            .await;

        let url = format!("{}/media/a.jpg", server.uri());
        let blob = fetcher()
            .fetch(&url, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(blob.filename, "a.jpg");
        assert_eq!(&blob.bytes[..], b"jpeg-bytes");
    }

    #[tokio::test]
    async fn test_fetch_extension_from_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/abc123"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(b"png".to_vec()),
            )
            .mount(&server)
            .await;

        let url = format!("{}/abc123?imageView2/format/png", server.uri());
        let blob = fetcher()
            .fetch(&url, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(blob.filename, "abc123.png");
    }

    #[tokio::test]
    async fn test_fetch_follows_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/short"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{}/real.mp4", server.uri()).as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/real.mp4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "video/mp4")
                    .set_body_bytes(b"mp4".to_vec()),
            )
            .mount(&server)
            .await;

        let url = format!("{}/short", server.uri());
        let blob = fetcher()
            .fetch(&url, &CancellationToken::new())
            .await
            .unwrap();

        // Named after the requested URL, not the redirect target
        assert_eq!(blob.filename, "short.mp4");
        assert_eq!(&blob.bytes[..], b"mp4");
    }

    #[tokio::test]
    async fn test_fetch_not_found_tries_three_times() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .expect(3)
            .mount(&server)
            .await;

        let url = format!("{}/gone.jpg", server.uri());
        let failure = fetcher()
            .fetch(&url, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::HttpStatus(404));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow.jpg"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let fetcher = Fetcher {
            client: Client::new(),
            policy: RetryPolicy::immediate(2),
            timeout: Duration::from_millis(50),
        };

        let url = format!("{}/slow.jpg", server.uri());
        let failure = fetcher
            .fetch(&url, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::Timeout);
    }

    #[tokio::test]
    async fn test_fetch_recovers_after_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky.jpg"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .mount(&server)
            .await;

        let url = format!("{}/flaky.jpg", server.uri());
        let blob = fetcher()
            .fetch(&url, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(&blob.bytes[..], b"ok");
    }
}
