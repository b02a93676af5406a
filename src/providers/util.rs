use anyhow::{Context, Result};
use reqwest::{Client, Url};
use std::time::Duration;

use crate::core::price::QuoteError;

/// Builds the HTTP client shared by a provider. Every request made with it
/// is bounded by `timeout`.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent("folio/1.0")
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Builds `{base_url}/{endpoint}` with `params` percent-encoded into the
/// query string.
pub fn endpoint_url(
    provider: &str,
    base_url: &str,
    endpoint: &str,
    params: &[(&str, &str)],
) -> Result<Url, QuoteError> {
    Url::parse_with_params(&format!("{base_url}/{endpoint}"), params).map_err(|e| {
        QuoteError::Transport {
            provider: provider.to_string(),
            message: format!("Failed to build URL: {e}"),
        }
    })
}

/// Maps a reqwest failure onto the per-symbol error reported for it.
pub fn request_error(provider: &str, err: reqwest::Error) -> QuoteError {
    if err.is_timeout() {
        QuoteError::Timeout {
            provider: provider.to_string(),
        }
    } else {
        QuoteError::Transport {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }
}

/// Reads a response body, turning non-success statuses into errors.
pub async fn response_text(
    provider: &str,
    response: reqwest::Response,
) -> Result<String, QuoteError> {
    let status = response.status();
    if !status.is_success() {
        return Err(QuoteError::Status {
            provider: provider.to_string(),
            status: status.as_u16(),
        });
    }
    response
        .text()
        .await
        .map_err(|e| request_error(provider, e))
}
