//! media-relay - relay media from share links into an image-hosting service
//!
//! This library resolves a share link into a [`MediaManifest`], then fetches
//! every image, live photo and video it lists and uploads them to a storage
//! endpoint, grouped by author.
//!
//! # Features
//!
//! - RedBook share-link resolution with PNG/JPG availability probing
//! - Parser-service JSON manifests
//! - Bounded concurrent fetch and upload pools per media kind
//! - Per-item retries with cancellation and an optional run deadline
//!
//! # Example
//!
//! ```no_run
//! use media_relay::{build_client, Config, MediaManifest, TransferCoordinator, DEFAULT_USER_AGENT};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(&Config::default_path())?;
//!     let client = build_client(DEFAULT_USER_AGENT)?;
//!     let manifest = MediaManifest::from_json(&std::fs::read_to_string("note.json")?)?;
//!
//!     let report = TransferCoordinator::from_config(client, &config)
//!         .run(&manifest)
//!         .await?;
//!     println!("{}/{} delivered", report.total_delivered(), report.total_queued());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod output;
pub mod resolver;
pub mod transfer;

// Re-exports for convenience
pub use config::Config;
pub use error::{Error, Result, TransferFailure};
pub use media::{MediaKind, MediaManifest};
pub use resolver::{ManifestResolver, RedBookResolver};
pub use transfer::{build_client, RunReport, TransferCoordinator, DEFAULT_USER_AGENT};
