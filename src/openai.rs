//! OpenAI client configuration with sensible defaults.

use crate::error::{LecternError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client with the default timeout.
pub fn create_client() -> Result<Client<OpenAIConfig>> {
    create_client_with(Duration::from_secs(DEFAULT_TIMEOUT_SECS), None)
}

/// Create an OpenAI client with a custom timeout and optional API base URL.
///
/// The base URL lets the same client talk to OpenAI-compatible endpoints.
pub fn create_client_with(timeout: Duration, api_base: Option<&str>) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LecternError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let mut config = OpenAIConfig::default();
    if let Some(base) = api_base {
        config = config.with_api_base(base.trim_end_matches('/'));
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}
