//! Cheap availability checks using a partial-content request.

use std::time::Duration;

use reqwest::{header, Client, StatusCode};
use tokio_util::sync::CancellationToken;

use crate::config::TransferConfig;
use crate::error::TransferFailure;
use crate::transfer::retry::{with_retry, RetryPolicy};

/// Byte range requested by a probe.
const PROBE_RANGE: &str = "bytes=0-99";

/// Decides whether a URL is currently retrievable without downloading it.
#[derive(Debug, Clone)]
pub struct ResourceProber {
    client: Client,
    policy: RetryPolicy,
    timeout: Duration,
    cancel: CancellationToken,
}

impl ResourceProber {
    pub fn new(client: Client, config: &TransferConfig) -> Self {
        Self {
            client,
            policy: RetryPolicy::new(
                config.probe_attempts,
                Duration::from_millis(config.probe_retry_delay_ms),
            ),
            timeout: config.probe_timeout(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// `true` if the first bytes of `url` can be fetched.
    ///
    /// Never fails: exhausted retries, cancellation and unexpected statuses
    /// all read as "unavailable".
    pub async fn probe(&self, url: &str) -> bool {
        match with_retry(&self.policy, &self.cancel, url, |_| self.probe_once(url)).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Treating {} as unavailable: {}", url, e);
                false
            }
        }
    }

    async fn probe_once(&self, url: &str) -> Result<(), TransferFailure> {
        let response = self
            .client
            .get(url)
            .header(header::RANGE, PROBE_RANGE)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Probe {} -> {}", url, status);

        if status == StatusCode::OK || status == StatusCode::PARTIAL_CONTENT {
            Ok(())
        } else {
            Err(TransferFailure::status(status.as_u16()))
        }
    }
}
