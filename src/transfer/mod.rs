//! Transfer pipeline.
//!
//! This module provides:
//! - A shared HTTP client builder
//! - Bounded retry with cancellation
//! - Resource probing, fetching and uploading of single items
//! - The coordinator that runs whole manifests through bounded pools

pub mod coordinator;
pub mod fetch;
pub mod probe;
pub mod retry;
pub mod state;
pub mod upload;

use reqwest::{redirect, Client};

use crate::error::{Error, Result};

pub use coordinator::{TransferCoordinator, DEFAULT_CONCURRENCY};
pub use fetch::{Fetch, Fetcher};
pub use probe::ResourceProber;
pub use retry::{with_retry, RetryPolicy};
pub use state::{BatchReport, ItemFailure, RunPhase, RunReport, Stage};
pub use upload::{Upload, Uploader};

/// Default user agent for media requests.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

/// Maximum redirects followed per request.
const MAX_REDIRECTS: usize = 10;

/// Build the HTTP client shared by the resolver, prober, fetcher and uploader.
pub fn build_client(user_agent: &str) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
        .cookie_store(true)
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}
