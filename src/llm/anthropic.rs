//! Anthropic Messages API service.
//!
//! The engine's protocol types already match the Messages wire format, so
//! requests are serialized as-is and responses deserialize directly.

use super::types::{ModelRequest, ModelResponse};
use super::ModelService;
use crate::error::{LecternError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// Anthropic model service.
pub struct AnthropicService {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AnthropicService {
    /// Create a new service with the given API key and request timeout.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LecternError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the service at a different API host.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

/// Map a non-success HTTP status to an error.
fn status_error(status: StatusCode, retry_after: Option<u64>, body: String) -> LecternError {
    match status {
        StatusCode::UNAUTHORIZED => LecternError::Auth("invalid API key".to_string()),
        StatusCode::TOO_MANY_REQUESTS => LecternError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(60),
        },
        _ => LecternError::Provider {
            status: status.as_u16(),
            message: body,
        },
    }
}

#[async_trait]
impl ModelService for AnthropicService {
    fn name(&self) -> &str {
        "Anthropic"
    }

    #[instrument(skip_all, fields(model = %request.model, messages = request.messages.len()))]
    async fn create_message(&self, request: &ModelRequest) -> Result<ModelResponse> {
        debug!("Anthropic messages request");

        let resp = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| LecternError::ModelService(format!("request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, retry_after, body));
        }

        let response: ModelResponse = resp
            .json()
            .await
            .map_err(|e| LecternError::ModelService(format!("invalid response: {}", e)))?;

        debug!(
            stop_reason = ?response.stop_reason,
            blocks = response.content.len(),
            "Anthropic response"
        );

        Ok(response)
    }
}
