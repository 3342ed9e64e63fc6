//! Configuration module for media-relay.
//!
//! This module handles:
//! - Loading configuration from TOML files
//! - Configuration validation
//!
//! CLI overrides are merged in by [`crate::cli::Args`].

pub mod loader;
pub mod validation;

pub use loader::{Config, ResolverConfig, TransferConfig, UploadConfig};
pub use validation::validate_config;
