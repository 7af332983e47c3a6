//! LLM integration for Smart Reply.
//!
//! The generator only sees the `LlmProvider` trait. Transport is rig-core's
//! OpenAI chat completions client, bridged by `RigAdapter`, so any compatible
//! endpoint works by pointing `base_url` at it.

pub mod provider;
mod rig_adapter;

pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;
use std::time::Duration;

use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::error::ConfigError;

/// Default upper bound on a single provider call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn new(api_key: secrecy::SecretString, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, ConfigError> {
    use rig::providers::openai;

    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        openai::Client::builder()
            .api_key(config.api_key.expose_secret())
            .base_url(&config.base_url)
            .build()
            .map_err(|e| ConfigError::ClientBuild {
                provider: "openai".to_string(),
                reason: e.to_string(),
            })?;

    // Chat completions rather than the responses API: it is what compatible
    // endpoints implement, and it accepts `response_format`.
    let model = client.completions_api().completion_model(&config.model);
    tracing::info!(model = %config.model, base_url = %config.base_url, "Using OpenAI-compatible provider");
    Ok(Arc::new(RigAdapter::new(
        model,
        &config.model,
        "openai",
        config.timeout,
    )))
}
