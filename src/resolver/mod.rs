//! Share-link resolvers.
//!
//! A resolver turns a share URL into a [`MediaManifest`]. The transfer
//! pipeline only ever sees the manifest.

pub mod redbook;

use async_trait::async_trait;

use crate::error::Result;
use crate::media::MediaManifest;

pub use redbook::RedBookResolver;

/// Turns a share link into a media manifest.
#[async_trait]
pub trait ManifestResolver: Send + Sync {
    /// Resolve `share_url`.
    ///
    /// Expired links fail with [`crate::Error::ExpiredLink`]; every other
    /// problem is a [`crate::Error::Resolution`].
    async fn resolve(&self, share_url: &str) -> Result<MediaManifest>;
}
