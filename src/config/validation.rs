//! Configuration validation logic.

use secrecy::ExposeSecret;
use url::Url;

use crate::config::loader::{Config, TransferConfig};
use crate::error::{Error, Result};

/// Upper bound for simultaneous requests per batch.
const MAX_CONCURRENCY: usize = 64;

/// Upper bound for attempts per request.
const MAX_ATTEMPTS: u32 = 10;

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_endpoint(&config.upload.endpoint)?;
    validate_token(config.upload.token.expose_secret())?;
    validate_transfer(&config.transfer)?;

    Ok(())
}

/// Validate the upload endpoint base URL.
pub fn validate_endpoint(endpoint: &str) -> Result<()> {
    if endpoint.trim().is_empty() {
        return Err(Error::MissingConfig(
            "upload endpoint (set --endpoint or IMG_DOMAIN)".to_string(),
        ));
    }

    let url = Url::parse(endpoint)?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Error::ConfigValidation {
            field: "endpoint".to_string(),
            message: format!("Unsupported scheme '{}'", url.scheme()),
        });
    }

    Ok(())
}

/// Validate the upload bearer token.
pub fn validate_token(token: &str) -> Result<()> {
    if token.trim().is_empty() {
        return Err(Error::MissingConfig(
            "upload token (set --token or UPLOAD_TOKEN)".to_string(),
        ));
    }

    // Check for placeholder values
    let token_lower = token.to_lowercase();
    if token_lower.contains("replaceme") || token_lower.contains("your_token") {
        return Err(Error::ConfigValidation {
            field: "token".to_string(),
            message: "Token appears to be a placeholder.".to_string(),
        });
    }

    Ok(())
}

/// Validate transfer limits.
pub fn validate_transfer(transfer: &TransferConfig) -> Result<()> {
    if transfer.concurrency == 0 || transfer.concurrency > MAX_CONCURRENCY {
        return Err(Error::ConfigValidation {
            field: "concurrency".to_string(),
            message: format!(
                "Must be between 1 and {} (got {})",
                MAX_CONCURRENCY, transfer.concurrency
            ),
        });
    }

    for (field, attempts) in [
        ("fetch_attempts", transfer.fetch_attempts),
        ("upload_attempts", transfer.upload_attempts),
        ("probe_attempts", transfer.probe_attempts),
    ] {
        if attempts == 0 || attempts > MAX_ATTEMPTS {
            return Err(Error::ConfigValidation {
                field: field.to_string(),
                message: format!("Must be between 1 and {} (got {})", MAX_ATTEMPTS, attempts),
            });
        }
    }

    for (field, secs) in [
        ("fetch_timeout_secs", transfer.fetch_timeout_secs),
        ("upload_timeout_secs", transfer.upload_timeout_secs),
        ("probe_timeout_secs", transfer.probe_timeout_secs),
    ] {
        if secs == 0 {
            return Err(Error::ConfigValidation {
                field: field.to_string(),
                message: "Timeout must be at least one second".to_string(),
            });
        }
    }

    if transfer.run_deadline_secs == Some(0) {
        return Err(Error::ConfigValidation {
            field: "run_deadline_secs".to_string(),
            message: "Deadline must be at least one second".to_string(),
        });
    }

    Ok(())
}
