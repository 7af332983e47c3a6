//! Draft generation: the local heuristic pipeline, or a provider call with
//! bounded retries on malformed output.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::confidence::{ScoreInputs, score};
use super::constraints::{adjust, evaluate};
use super::context::extract_phrase;
use super::format::format_for;
use super::prompts::{SYSTEM_PROMPT, build_user_prompt};
use super::synth::base_drafts;
use super::types::{Draft, DraftRequest, DraftResponse, Violation};
use crate::error::{ConfigError, GenerationError};
use crate::llm::{ChatMessage, CompletionRequest, LlmConfig, LlmProvider, create_provider};

/// Tuning for provider-backed generation.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Extra attempts after the first when the reply fails to parse or validate.
    pub max_retries: u32,
    /// Prompt for UK spelling unless the request overrides it.
    pub uk_english_default: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            max_tokens: 800,
            max_retries: 2,
            uk_english_default: true,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidValue {
                key: "temperature".into(),
                message: format!("{} not in 0.0..=2.0", self.temperature),
            });
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_tokens".into(),
                message: "must be positive".into(),
            });
        }
        Ok(())
    }

    fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Produces three reply drafts for a request.
///
/// Without a provider every request runs the local pipeline. With one, the
/// provider is the only source of drafts and there is no local fallback.
pub struct DraftGenerator {
    provider: Option<Arc<dyn LlmProvider>>,
    config: GeneratorConfig,
}

impl DraftGenerator {
    /// Generator that never leaves the process.
    pub fn local(config: GeneratorConfig) -> Self {
        Self {
            provider: None,
            config,
        }
    }

    pub fn with_provider(provider: Arc<dyn LlmProvider>, config: GeneratorConfig) -> Self {
        Self {
            provider: Some(provider),
            config,
        }
    }

    /// Build from optional provider settings. `None` selects the local pipeline.
    pub fn from_llm_config(
        llm: Option<&LlmConfig>,
        config: GeneratorConfig,
    ) -> Result<Self, GenerationError> {
        config.validate()?;
        match llm {
            Some(llm) => Ok(Self::with_provider(create_provider(llm)?, config)),
            None => Ok(Self::local(config)),
        }
    }

    pub fn uses_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Generate drafts for an already validated request.
    pub async fn generate(&self, request: &DraftRequest) -> Result<DraftResponse, GenerationError> {
        match &self.provider {
            Some(provider) => self.generate_with_provider(provider.as_ref(), request).await,
            None => Ok(self.generate_local(request)),
        }
    }

    /// Synthesize, correct, format and score. Never fails.
    pub fn generate_local(&self, request: &DraftRequest) -> DraftResponse {
        let phrase = extract_phrase(request.context.as_deref());
        let constraints = request.constraints.as_ref();
        let emoji = request.emoji_enabled();

        let mut drafts = Vec::with_capacity(3);
        let mut corrections: Vec<(String, Vec<Violation>)> = Vec::new();
        let mut formatting_applied = false;

        for draft in base_drafts(request.incoming_message.trim(), request.channel, phrase.as_deref()) {
            let evaluation = evaluate(&draft.text, constraints);
            let text = if evaluation.passed() {
                draft.text
            } else {
                corrections.push((draft.label.clone(), evaluation.violations));
                adjust(&draft.text, constraints)
            };

            let (formatted, format_score) = format_for(request.channel, &text, emoji);
            formatting_applied |= format_score > 0.0;
            drafts.push(Draft::new(draft.label, formatted));
        }

        let confidence = score(ScoreInputs {
            drafts: &drafts,
            constraints,
            formatting_applied,
            context_phrase: phrase.as_deref(),
        });

        let mut notes = vec!["Local pipeline used; no provider configured.".to_string()];
        if formatting_applied {
            notes.push(format!("Applied {} formatting.", request.channel));
        }
        for (label, violations) in &corrections {
            let names: Vec<&str> = violations.iter().map(Violation::as_str).collect();
            notes.push(format!("Adjusted {label} draft for {}.", names.join(", ")));
        }
        if phrase.is_none() && request.context.as_deref().is_some_and(|c| !c.trim().is_empty()) {
            notes.push("Context was too vague to reference.".to_string());
        }

        info!(
            drafts = drafts.len(),
            corrected = corrections.len(),
            confidence = confidence.score,
            channel = %request.channel,
            "Local drafts generated"
        );

        DraftResponse {
            request_id: format!("local-{}", Uuid::new_v4()),
            detected_tone: request.tone.as_str().to_string(),
            channel_applied: request.channel.as_str().to_string(),
            drafts,
            notes: notes.join(" "),
            confidence_score: confidence.score,
        }
    }

    async fn generate_with_provider(
        &self,
        provider: &dyn LlmProvider,
        request: &DraftRequest,
    ) -> Result<DraftResponse, GenerationError> {
        let user_prompt = build_user_prompt(request, self.config.uk_english_default);
        let max_attempts = self.config.max_attempts();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let completion = CompletionRequest::new(vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(user_prompt.clone()),
            ])
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens)
            .with_json_mode();

            let started = Instant::now();
            let result = provider.complete(completion).await;
            let latency_ms = started.elapsed().as_millis() as u64;

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    warn!(attempt, latency_ms, model = provider.model_name(), error = %e, "Provider call failed");
                    return Err(GenerationError::Provider(e));
                }
            };
            let call_id = response
                .response_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string());

            match parse_reply(&response.content) {
                Ok(drafts) => {
                    info!(
                        attempt,
                        latency_ms,
                        call_id = %call_id,
                        output_tokens = response.output_tokens,
                        "Provider drafts accepted"
                    );
                    return Ok(drafts);
                }
                Err(reason) => {
                    warn!(attempt, latency_ms, call_id = %call_id, reason = %reason, "Provider reply rejected");
                    last_error = reason;
                }
            }
        }

        Err(GenerationError::RetriesExhausted {
            attempts: max_attempts,
            last_error,
        })
    }
}

/// Decode a provider reply into a response, tolerating markdown fences.
fn parse_reply(content: &str) -> Result<DraftResponse, String> {
    let json = extract_json_object(content);
    let response: DraftResponse =
        serde_json::from_str(&json).map_err(|e| format!("invalid JSON: {e}"))?;
    response
        .check_shape()
        .map_err(|e| format!("schema mismatch: {e}"))?;
    debug!(request_id = %response.request_id, "Provider reply parsed");
    Ok(response)
}

/// Pull a JSON object out of a reply that may be wrapped in a code fence or
/// surrounded by prose.
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::drafts::types::{Channel, Constraints};
    use crate::error::LlmError;
    use crate::llm::{CompletionResponse, FinishReason};

    const VALID_REPLY: &str = r#"{
        "request_id": "llm-1",
        "detected_tone": "friendly",
        "channel_applied": "slack",
        "drafts": [
            {"label": "Direct", "text": "Sounds good."},
            {"label": "Friendly", "text": "Happy to help!"},
            {"label": "Action-oriented", "text": "Can we sync today?"}
        ],
        "notes": "ok",
        "confidence_score": 0.83
    }"#;

    /// Replays scripted replies in order and counts calls.
    struct ScriptedProvider {
        replies: Mutex<Vec<Result<String, LlmError>>>,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            let mut replies = replies;
            replies.reverse();
            Arc::new(Self {
                replies: Mutex::new(replies),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            assert!(request.json_mode);
            assert_eq!(request.messages.len(), 2);
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok("{}".to_string()));
            next.map(|content| CompletionResponse {
                content,
                input_tokens: 10,
                output_tokens: 10,
                finish_reason: FinishReason::Stop,
                response_id: None,
            })
        }
    }

    fn request() -> DraftRequest {
        DraftRequest::new("Could you send over the Q1 metrics?")
            .with_context("This is for the Q1 board review")
            .with_channel(Channel::Slack)
    }

    #[tokio::test]
    async fn local_pipeline_returns_three_labelled_drafts() {
        let generator = DraftGenerator::local(GeneratorConfig::default());
        let response = generator.generate(&request()).await.unwrap();

        assert!(response.request_id.starts_with("local-"));
        assert!(response.notes.contains("Local pipeline"));
        assert_eq!(response.channel_applied, "slack");
        assert_eq!(response.detected_tone, "professional");
        assert!(response.check_shape().is_ok());
        let labels: Vec<&str> = response.drafts.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["Direct", "Friendly", "Action-oriented"]);
    }

    #[tokio::test]
    async fn local_pipeline_notes_corrections() {
        let generator = DraftGenerator::local(GeneratorConfig::default());
        let request = DraftRequest::new("Please send ASAP. No question here.").with_constraints(
            Constraints {
                max_words: Some(40),
                must_include_question: true,
                avoid_phrases: Some(vec!["ASAP".into()]),
            },
        );
        let response = generator.generate(&request).await.unwrap();
        assert!(response.notes.contains("must_include_question"));
        for draft in &response.drafts {
            assert!(!draft.text.contains("ASAP"));
            assert!(draft.text.contains('?'));
        }
        assert!((0.0..=1.0).contains(&response.confidence_score));
    }

    #[tokio::test]
    async fn vague_context_is_noted() {
        let generator = DraftGenerator::local(GeneratorConfig::default());
        let request = DraftRequest::new("Sure thing.").with_context("this");
        let response = generator.generate(&request).await.unwrap();
        assert!(response.notes.contains("too vague"));
    }

    #[tokio::test]
    async fn valid_first_reply_is_returned() {
        let provider = ScriptedProvider::new(vec![Ok(VALID_REPLY.to_string())]);
        let generator = DraftGenerator::with_provider(provider.clone(), GeneratorConfig::default());
        let response = generator.generate(&request()).await.unwrap();
        assert_eq!(response.request_id, "llm-1");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn succeeds_on_third_attempt_after_two_invalid_replies() {
        let provider = ScriptedProvider::new(vec![
            Ok("not json".to_string()),
            Ok(r#"{"request_id": "x"}"#.to_string()),
            Ok(format!("```json\n{VALID_REPLY}\n```")),
        ]);
        let generator = DraftGenerator::with_provider(provider.clone(), GeneratorConfig::default());
        let response = generator.generate(&request()).await.unwrap();
        assert_eq!(response.drafts.len(), 3);
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn retries_exhaust_without_local_fallback() {
        let provider = ScriptedProvider::new(vec![
            Ok("nope".to_string()),
            Ok("nope".to_string()),
            Ok("nope".to_string()),
            Ok(VALID_REPLY.to_string()),
        ]);
        let generator = DraftGenerator::with_provider(provider.clone(), GeneratorConfig::default());
        let err = generator.generate(&request()).await.unwrap_err();
        match err {
            GenerationError::RetriesExhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("invalid JSON"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn wrong_draft_count_is_retried() {
        let two_drafts = VALID_REPLY.replace(
            r#",
            {"label": "Action-oriented", "text": "Can we sync today?"}"#,
            "",
        );
        let provider = ScriptedProvider::new(vec![Ok(two_drafts), Ok(VALID_REPLY.to_string())]);
        let generator = DraftGenerator::with_provider(provider.clone(), GeneratorConfig::default());
        assert!(generator.generate(&request()).await.is_ok());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn transport_errors_are_not_retried() {
        let provider = ScriptedProvider::new(vec![
            Err(LlmError::AuthFailed {
                provider: "scripted".into(),
            }),
            Ok(VALID_REPLY.to_string()),
        ]);
        let generator = DraftGenerator::with_provider(provider.clone(), GeneratorConfig::default());
        let err = generator.generate(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Provider(LlmError::AuthFailed { .. })
        ));
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn invalid_tuning_is_a_config_error() {
        let config = GeneratorConfig {
            temperature: 3.5,
            ..Default::default()
        };
        assert!(matches!(
            DraftGenerator::from_llm_config(None, config),
            Err(GenerationError::Config(_))
        ));
        let generator = DraftGenerator::from_llm_config(None, GeneratorConfig::default()).unwrap();
        assert!(!generator.uses_provider());
    }

    #[test]
    fn extract_json_from_fences_and_prose() {
        assert_eq!(extract_json_object(r#"{"a":1}"#), r#"{"a":1}"#);
        assert_eq!(
            extract_json_object("```json\n{\"a\":1}\n```"),
            r#"{"a":1}"#
        );
        assert_eq!(extract_json_object("```\n{\"a\":1}\n```"), r#"{"a":1}"#);
        assert_eq!(
            extract_json_object("Here you go: {\"a\":1} thanks"),
            r#"{"a":1}"#
        );
    }
}
