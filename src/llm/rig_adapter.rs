//! Bridges a rig-core completion model to our `LlmProvider` trait.

use std::time::Duration;

use async_trait::async_trait;
use rig::completion::{AssistantContent, CompletionError, CompletionModel, Message};
use serde::Serialize;
use tracing::debug;

use super::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role,
};
use crate::error::LlmError;

/// Wraps any rig `CompletionModel`. System messages become the preamble and
/// the last user message is the prompt.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    provider: &'static str,
    timeout: Duration,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str, provider: &'static str, timeout: Duration) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            provider,
            timeout,
        }
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + 'static,
    M::Response: Serialize,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let (preamble, mut history) = split_messages(&request.messages);
        let prompt = history.pop().ok_or_else(|| LlmError::RequestFailed {
            provider: self.provider.to_string(),
            reason: "request has no user message".to_string(),
        })?;

        let mut builder = self.model.completion_request(prompt).messages(history);
        if let Some(preamble) = preamble {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(u64::from(max_tokens));
        }
        if request.json_mode {
            builder = builder
                .additional_params(serde_json::json!({ "response_format": { "type": "json_object" } }));
        }

        debug!(model = %self.model_name, messages = request.messages.len(), "Sending completion");
        let response = tokio::time::timeout(self.timeout, builder.send())
            .await
            .map_err(|_| LlmError::RequestFailed {
                provider: self.provider.to_string(),
                reason: format!("timed out after {}s", self.timeout.as_secs()),
            })?
            .map_err(|e| map_error(self.provider, e))?;

        let content: String = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect();
        let (response_id, finish_reason) = raw_metadata(&response.raw_response);

        Ok(CompletionResponse {
            content,
            input_tokens: u32::try_from(response.usage.input_tokens).unwrap_or(u32::MAX),
            output_tokens: u32::try_from(response.usage.output_tokens).unwrap_or(u32::MAX),
            finish_reason,
            response_id,
        })
    }
}

/// Join system messages into a preamble; everything else stays in order.
fn split_messages(messages: &[ChatMessage]) -> (Option<String>, Vec<Message>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let preamble = (!system.is_empty()).then(|| system.join("\n\n"));
    let history = messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| Message::user(m.content.clone()))
        .collect();
    (preamble, history)
}

/// Pull the call id and finish reason out of the provider's raw envelope.
fn raw_metadata(raw: &impl Serialize) -> (Option<String>, FinishReason) {
    let Ok(value) = serde_json::to_value(raw) else {
        return (None, FinishReason::Unknown);
    };
    let id = value["id"].as_str().map(str::to_string);
    let reason = FinishReason::from_provider(value["choices"][0]["finish_reason"].as_str());
    (id, reason)
}

fn map_error(provider: &str, err: CompletionError) -> LlmError {
    match err {
        CompletionError::ProviderError(message) => classify_provider_error(provider, message),
        CompletionError::ResponseError(reason) => LlmError::InvalidResponse {
            provider: provider.to_string(),
            reason,
        },
        CompletionError::JsonError(e) => LlmError::InvalidResponse {
            provider: provider.to_string(),
            reason: e.to_string(),
        },
        other => LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: other.to_string(),
        },
    }
}

/// rig surfaces non-2xx replies as the provider's error text.
fn classify_provider_error(provider: &str, message: String) -> LlmError {
    let lower = message.to_lowercase();
    let mentions = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if mentions(&["401", "403", "invalid_api_key", "incorrect api key", "unauthorized"]) {
        LlmError::AuthFailed {
            provider: provider.to_string(),
        }
    } else if mentions(&["429", "rate limit", "rate_limit"]) {
        LlmError::RateLimited {
            provider: provider.to_string(),
            retry_after: None,
        }
    } else {
        LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: message,
        }
    }
}
