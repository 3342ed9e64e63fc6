//! Command-line argument definitions using clap.

use clap::Parser;
use secrecy::Secret;
use std::path::PathBuf;

use crate::config::Config;

/// Relay media from a share link into an image-hosting service.
#[derive(Parser, Debug)]
#[command(
    name = "media-relay",
    version,
    about = "Relay media from a share link into an image-hosting service",
    long_about = "Resolves a RedBook share link into its images, live photos and video,\n\
                  downloads them concurrently and uploads them to a storage endpoint\n\
                  under img/<author> and video/<author>."
)]
pub struct Args {
    /// Share URL to resolve.
    #[arg(required_unless_present = "manifest")]
    pub share_url: Option<String>,

    /// Read a parser-service JSON response from a file instead of resolving a URL.
    #[arg(short, long, conflicts_with = "share_url")]
    pub manifest: Option<PathBuf>,

    /// Path to configuration file (defaults to the platform config directory).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Storage service base URL.
    #[arg(short, long, env = "IMG_DOMAIN")]
    pub endpoint: Option<String>,

    /// Bearer token for the storage service.
    #[arg(short, long, env = "UPLOAD_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Simultaneous transfers per batch.
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Attempts per fetch and per upload.
    #[arg(long)]
    pub attempts: Option<u32>,

    /// Cancel the run after this many seconds.
    #[arg(long)]
    pub deadline: Option<u64>,

    /// Fixed user agent for share-page requests.
    #[arg(short = 'a', long = "user-agent")]
    pub user_agent: Option<String>,

    /// Resolve and print the manifest without transferring anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Hide progress bars and print a one-line summary.
    #[arg(long, short)]
    pub quiet: bool,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,
}

impl Args {
    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(&self, config: &mut Config) {
        if let Some(endpoint) = &self.endpoint {
            config.upload.endpoint = endpoint.clone();
        }

        if let Some(token) = &self.token {
            config.upload.token = Secret::new(token.clone());
        }

        if let Some(concurrency) = self.concurrency {
            config.transfer.concurrency = concurrency;
        }

        if let Some(attempts) = self.attempts {
            config.transfer.fetch_attempts = attempts;
            config.transfer.upload_attempts = attempts;
        }

        if let Some(deadline) = self.deadline {
            config.transfer.run_deadline_secs = Some(deadline);
        }

        if let Some(user_agent) = &self.user_agent {
            config.resolver.user_agent = Some(user_agent.clone());
        }

        if self.quiet {
            config.transfer.show_progress = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_parse_share_url() {
        let args = Args::try_parse_from(["media-relay", "https://www.xiaohongshu.com/explore/abc"]).unwrap();
        assert_eq!(
            args.share_url.as_deref(),
            Some("https://www.xiaohongshu.com/explore/abc")
        );
        assert!(!args.dry_run);
    }

    #[test]
    fn test_share_url_or_manifest_required() {
        assert!(Args::try_parse_from(["media-relay"]).is_err());
        let args = Args::try_parse_from(["media-relay", "--manifest", "note.json"]).unwrap();
        assert_eq!(args.manifest, Some(PathBuf::from("note.json")));
    }

    #[test]
    fn test_merge_overrides() {
        let args = Args::try_parse_from([
            "media-relay",
            "https://x/explore/abc",
            "--endpoint",
            "https://img.example.com",
            "--token",
            "tok",
            "-j",
            "2",
            "--attempts",
            "4",
            "--deadline",
            "120",
            "--quiet",
        ])
        .unwrap();

        let mut config = Config::default();
        args.merge_into_config(&mut config);

        assert_eq!(config.upload.endpoint, "https://img.example.com");
        assert_eq!(config.upload.token.expose_secret(), "tok");
        assert_eq!(config.transfer.concurrency, 2);
        assert_eq!(config.transfer.fetch_attempts, 4);
        assert_eq!(config.transfer.upload_attempts, 4);
        assert_eq!(config.transfer.run_deadline_secs, Some(120));
        assert!(!config.transfer.show_progress);
    }

    #[test]
    fn test_merge_keeps_config_when_unset() {
        let args = Args::try_parse_from(["media-relay", "--manifest", "m.json"]).unwrap();
        let mut config = Config::default();
        config.upload.endpoint = "https://from-file.example.com".to_string();
        args.merge_into_config(&mut config);
        assert_eq!(config.upload.endpoint, "https://from-file.example.com");
        assert_eq!(config.transfer.concurrency, 5);
    }
}
