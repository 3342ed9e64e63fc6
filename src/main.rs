//! media-relay - CLI entry point.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

use media_relay::{
    cli::Args,
    config::{validate_config, Config},
    error::{exit_codes, Error, Result},
    media::MediaManifest,
    output::{
        print_banner, print_error, print_info, print_manifest_summary, print_run_report,
        print_success, print_summary, print_warning,
    },
    resolver::{ManifestResolver, RedBookResolver},
    transfer::{build_client, TransferCoordinator, DEFAULT_USER_AGENT},
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            print_error(&format!("{}", e));
            match e {
                Error::Config(_) | Error::ConfigValidation { .. } | Error::MissingConfig(_) => {
                    ExitCode::from(exit_codes::CONFIG_ERROR as u8)
                }
                Error::ExpiredLink(_) => ExitCode::from(exit_codes::EXPIRED_LINK as u8),
                Error::Resolution(_) | Error::ParserService { .. } | Error::InvalidManifest(_) => {
                    ExitCode::from(exit_codes::RESOLUTION_ERROR as u8)
                }
                _ => ExitCode::from(exit_codes::UNEXPECTED_ERROR as u8),
            }
        }
    }
}

async fn run() -> Result<i32> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt().with_env_filter(filter).with_target(false).init();

    if !args.quiet {
        print_banner();
    }

    let mut config = load_config(args.config.as_deref())?;
    args.merge_into_config(&mut config);

    let client = build_client(DEFAULT_USER_AGENT)?;

    let manifest = match (&args.manifest, &args.share_url) {
        (Some(path), _) => {
            let text = std::fs::read_to_string(path)?;
            MediaManifest::from_json(&text)?
        }
        (None, Some(share_url)) => {
            print_info(&format!("Resolving {}", share_url));
            RedBookResolver::new(client.clone(), &config)
                .resolve(share_url)
                .await?
        }
        (None, None) => {
            return Err(Error::MissingConfig(
                "a share URL or --manifest file".to_string(),
            ))
        }
    };

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(exit_codes::SUCCESS);
    }

    validate_config(&config)?;

    if !args.quiet {
        print_manifest_summary(&manifest);
    }

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let report = TransferCoordinator::from_config(client, &config)
        .with_cancellation(cancel)
        .run(&manifest)
        .await?;

    if args.quiet {
        print_summary(&report);
    } else {
        print_run_report(&report);
    }

    if report.cancelled {
        print_warning("Run cancelled before every item was transferred");
        return Ok(exit_codes::ABORT);
    }

    if report.is_complete() {
        print_success("Upload finish");
    } else {
        print_warning(&format!(
            "{} of {} items were not delivered",
            report.total_queued() - report.total_delivered(),
            report.total_queued()
        ));
    }

    Ok(exit_codes::SUCCESS)
}

/// Explicit path, else the platform default if present, else built-in defaults.
fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return Config::load(path);
    }

    let default_path = Config::default_path();
    if default_path.exists() {
        Config::load(&default_path)
    } else {
        tracing::debug!(
            "No configuration file at {}, using defaults",
            default_path.display()
        );
        Ok(Config::default())
    }
}

fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            print_warning("Interrupted, cancelling in-flight transfers");
            cancel.cancel();
        }
    });
}
