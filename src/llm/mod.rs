//! Hosted language model integration.
//!
//! The conversation engine speaks one protocol, the block-based Messages
//! format in [`types`]. Each provider adapter implements [`ModelService`]
//! and translates to its own wire format where needed:
//!
//! - **Anthropic**: Messages API, spoken natively
//! - **OpenAI**: chat completions with tool calls (also compatible endpoints)

mod anthropic;
#[cfg(test)]
pub(crate) mod mock;
mod openai;
pub mod types;

pub use anthropic::AnthropicService;
pub use openai::OpenAiService;
pub use types::*;

use crate::config::{ModelProvider, ModelSettings};
use crate::error::{LecternError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A hosted model that answers one round at a time.
#[async_trait]
pub trait ModelService: Send + Sync {
    /// Provider display name.
    fn name(&self) -> &str;

    /// Send one request and wait for the complete response.
    async fn create_message(&self, request: &ModelRequest) -> Result<ModelResponse>;
}

/// Create the configured model service.
///
/// The API key is read from the provider's environment variable.
pub fn create_service(settings: &ModelSettings) -> Result<Arc<dyn ModelService>> {
    let key_var = settings.provider.api_key_var();
    let api_key = std::env::var(key_var)
        .ok()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| LecternError::Config(format!("{} not set", key_var)))?;

    let timeout = Duration::from_secs(settings.timeout_secs);

    let service: Arc<dyn ModelService> = match settings.provider {
        ModelProvider::Anthropic => {
            let mut service = AnthropicService::new(api_key, timeout)?;
            if let Some(base) = &settings.base_url {
                service = service.with_base_url(base);
            }
            Arc::new(service)
        }
        // async-openai reads OPENAI_API_KEY from the environment itself
        ModelProvider::OpenAI => Arc::new(OpenAiService::new(timeout, settings.base_url.as_deref())?),
    };

    Ok(service)
}
