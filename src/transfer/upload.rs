//! Pushing blobs to the storage endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use secrecy::{ExposeSecret, Secret};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{FailureKind, TransferFailure};
use crate::media::NamedBlob;
use crate::transfer::retry::{with_retry, RetryPolicy};

/// Multipart field carrying the file.
const FILE_FIELD: &str = "file";

/// Something that can store a named blob under a folder.
#[async_trait]
pub trait Upload: Send + Sync {
    async fn upload(
        &self,
        blob: &NamedBlob,
        folder: &str,
        cancel: &CancellationToken,
    ) -> Result<(), TransferFailure>;
}

/// Multipart uploader for the storage endpoint.
#[derive(Debug, Clone)]
pub struct Uploader {
    client: Client,
    url: String,
    token: Secret<String>,
    upload_channel: String,
    server_compress: bool,
    auto_retry: bool,
    policy: RetryPolicy,
    timeout: Duration,
}

impl Uploader {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            url: config.upload_url(),
            token: config.upload.token.clone(),
            upload_channel: config.upload.upload_channel.clone(),
            server_compress: config.upload.server_compress,
            auto_retry: config.upload.auto_retry,
            policy: RetryPolicy::new(
                config.transfer.upload_attempts,
                Duration::from_millis(config.transfer.upload_retry_delay_ms),
            ),
            timeout: config.transfer.upload_timeout(),
        }
    }

    fn query<'a>(&'a self, folder: &'a str) -> [(&'static str, &'a str); 4] {
        [
            ("uploadFolder", folder),
            ("serverCompress", bool_flag(self.server_compress)),
            ("uploadChannel", self.upload_channel.as_str()),
            ("autoRetry", bool_flag(self.auto_retry)),
        ]
    }

    async fn upload_once(&self, blob: &NamedBlob, folder: &str) -> Result<(), TransferFailure> {
        let mime = mime_guess::from_path(&blob.filename).first_or_octet_stream();
        let part = Part::stream_with_length(Body::from(blob.bytes.clone()), blob.len() as u64)
            .file_name(blob.filename.clone())
            .mime_str(mime.as_ref())?;
        let form = Form::new().part(FILE_FIELD, part);

        let response = self
            .client
            .post(&self.url)
            .query(&self.query(folder))
            .bearer_auth(self.token.expose_secret())
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransferFailure::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("HTTP {}: {}", status, body.trim()),
            ));
        }

        tracing::info!("Uploaded {} to {}", blob.filename, folder);
        Ok(())
    }
}

#[async_trait]
impl Upload for Uploader {
    async fn upload(
        &self,
        blob: &NamedBlob,
        folder: &str,
        cancel: &CancellationToken,
    ) -> Result<(), TransferFailure> {
        with_retry(&self.policy, cancel, &blob.filename, |_| {
            self.upload_once(blob, folder)
        })
        .await
    }
}

fn bool_flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
