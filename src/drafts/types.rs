//! Request, draft and response types for the reply drafting pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum characters accepted for the incoming message.
pub const MAX_MESSAGE_CHARS: usize = 4000;
/// Maximum characters accepted for free-text context.
pub const MAX_CONTEXT_CHARS: usize = 2000;
/// Inclusive bounds for `max_words`.
pub const MAX_WORDS_RANGE: (u32, u32) = (1, 2000);
/// Maximum number of forbidden phrases.
pub const MAX_AVOID_PHRASES: usize = 20;
/// Maximum characters per forbidden phrase.
pub const MAX_AVOID_PHRASE_CHARS: usize = 100;

/// Delivery channel the reply is formatted for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Email,
    Slack,
    Linkedin,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Slack => "slack",
            Self::Linkedin => "linkedin",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "slack" => Ok(Self::Slack),
            "linkedin" => Ok(Self::Linkedin),
            other => Err(format!("unknown channel: '{other}'")),
        }
    }
}

/// Requested tone of voice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Friendly,
    #[default]
    Professional,
    Concise,
    Assertive,
    Apologetic,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Friendly => "friendly",
            Self::Professional => "professional",
            Self::Concise => "concise",
            Self::Assertive => "assertive",
            Self::Apologetic => "apologetic",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-supplied limits a draft must satisfy.
///
/// A missing `Constraints` object means nothing is enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_words: Option<u32>,
    #[serde(default)]
    pub must_include_question: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avoid_phrases: Option<Vec<String>>,
}

impl Constraints {
    /// Forbidden phrases, ignoring blank entries.
    pub fn phrases(&self) -> impl Iterator<Item = &str> {
        self.avoid_phrases
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|p| !p.trim().is_empty())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(max) = self.max_words {
            let (min_words, max_words) = MAX_WORDS_RANGE;
            if !(min_words..=max_words).contains(&max) {
                return Err(ValidationError::OutOfRange {
                    field: "constraints.max_words",
                    value: max,
                    min: min_words,
                    max: max_words,
                });
            }
        }
        if let Some(phrases) = &self.avoid_phrases {
            if phrases.len() > MAX_AVOID_PHRASES {
                return Err(ValidationError::TooManyPhrases {
                    count: phrases.len(),
                    max: MAX_AVOID_PHRASES,
                });
            }
            for phrase in phrases {
                let length = phrase.chars().count();
                if length > MAX_AVOID_PHRASE_CHARS {
                    return Err(ValidationError::TooLong {
                        field: "constraints.avoid_phrases[]",
                        length,
                        max: MAX_AVOID_PHRASE_CHARS,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Per-request formatting switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DraftOptions {
    #[serde(default)]
    pub emoji: bool,
    /// `None` falls back to the service-wide UK spelling default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uk_english: Option<bool>,
}

/// An incoming request for reply drafts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DraftRequest {
    pub incoming_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default)]
    pub channel: Channel,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<DraftOptions>,
}

impl DraftRequest {
    /// Build a request with defaults for everything but the message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            incoming_message: message.into(),
            context: None,
            channel: Channel::default(),
            tone: Tone::default(),
            constraints: None,
            options: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    pub fn with_options(mut self, options: DraftOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Whether chat emoji may be appended.
    pub fn emoji_enabled(&self) -> bool {
        self.options.as_ref().is_some_and(|o| o.emoji)
    }

    /// Check bounds that serde cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.incoming_message.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "incoming_message",
            });
        }
        let length = self.incoming_message.chars().count();
        if length > MAX_MESSAGE_CHARS {
            return Err(ValidationError::TooLong {
                field: "incoming_message",
                length,
                max: MAX_MESSAGE_CHARS,
            });
        }
        if let Some(context) = &self.context {
            let length = context.chars().count();
            if length > MAX_CONTEXT_CHARS {
                return Err(ValidationError::TooLong {
                    field: "context",
                    length,
                    max: MAX_CONTEXT_CHARS,
                });
            }
        }
        if let Some(constraints) = &self.constraints {
            constraints.validate()?;
        }
        Ok(())
    }
}

/// The three fixed draft voices.
pub const DRAFT_LABELS: [&str; 3] = ["Direct", "Friendly", "Action-oriented"];

/// One generated reply variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Draft {
    pub label: String,
    pub text: String,
}

impl Draft {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// Outcome of checking one draft against its constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationResult {
    pub within_max_words: bool,
    pub includes_question: bool,
    pub avoids_phrases: bool,
    pub violations: Vec<Violation>,
}

impl EvaluationResult {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violated(&self, violation: Violation) -> bool {
        self.violations.contains(&violation)
    }
}

/// A constraint category that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    MaxWords,
    MustIncludeQuestion,
    AvoidPhrases,
}

impl Violation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxWords => "max_words",
            Self::MustIncludeQuestion => "must_include_question",
            Self::AvoidPhrases => "avoid_phrases",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The drafting result returned to callers and expected from the provider.
///
/// Unknown or missing fields in provider output are a validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DraftResponse {
    pub request_id: String,
    pub detected_tone: String,
    pub channel_applied: String,
    pub drafts: Vec<Draft>,
    pub notes: String,
    pub confidence_score: f64,
}

impl DraftResponse {
    /// Structural checks beyond what deserialization enforces.
    pub fn check_shape(&self) -> Result<(), String> {
        if self.request_id.trim().is_empty() {
            return Err("request_id is empty".into());
        }
        if self.drafts.len() != DRAFT_LABELS.len() {
            return Err(format!(
                "expected {} drafts, got {}",
                DRAFT_LABELS.len(),
                self.drafts.len()
            ));
        }
        for (idx, draft) in self.drafts.iter().enumerate() {
            if draft.label.trim().is_empty() {
                return Err(format!("draft {idx} has an empty label"));
            }
            if draft.text.trim().is_empty() {
                return Err(format!("draft {idx} has empty text"));
            }
            if self.drafts[..idx]
                .iter()
                .any(|d| d.label.eq_ignore_ascii_case(&draft.label))
            {
                return Err(format!("duplicate draft label '{}'", draft.label));
            }
        }
        if !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(format!(
                "confidence_score {} outside [0, 1]",
                self.confidence_score
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(drafts: Vec<Draft>, confidence: f64) -> DraftResponse {
        DraftResponse {
            request_id: "req-1".into(),
            detected_tone: "professional".into(),
            channel_applied: "email".into(),
            drafts,
            notes: String::new(),
            confidence_score: confidence,
        }
    }

    fn three_drafts() -> Vec<Draft> {
        DRAFT_LABELS
            .iter()
            .map(|label| Draft::new(*label, format!("{label} text")))
            .collect()
    }

    #[test]
    fn request_defaults_to_email_and_professional() {
        let req: DraftRequest = serde_json::from_str(r#"{"incoming_message": "Hi"}"#).unwrap();
        assert_eq!(req.channel, Channel::Email);
        assert_eq!(req.tone, Tone::Professional);
        assert!(req.constraints.is_none());
        assert!(!req.emoji_enabled());
    }

    #[test]
    fn unknown_channel_is_rejected_by_serde() {
        let err = serde_json::from_str::<DraftRequest>(
            r#"{"incoming_message": "Hi", "channel": "fax"}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn blank_message_fails_validation() {
        let req = DraftRequest::new("   ");
        assert_eq!(
            req.validate(),
            Err(ValidationError::Empty {
                field: "incoming_message"
            })
        );
    }

    #[test]
    fn max_words_out_of_range_fails_validation() {
        let req = DraftRequest::new("Hello").with_constraints(Constraints {
            max_words: Some(0),
            ..Default::default()
        });
        assert!(matches!(
            req.validate(),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn too_many_phrases_fails_validation() {
        let req = DraftRequest::new("Hello").with_constraints(Constraints {
            avoid_phrases: Some(vec!["x".to_string(); MAX_AVOID_PHRASES + 1]),
            ..Default::default()
        });
        assert!(matches!(
            req.validate(),
            Err(ValidationError::TooManyPhrases { .. })
        ));
    }

    #[test]
    fn response_shape_requires_three_distinct_drafts() {
        assert!(response(three_drafts(), 0.8).check_shape().is_ok());

        let mut two = three_drafts();
        two.pop();
        assert!(response(two, 0.8).check_shape().is_err());

        let mut dup = three_drafts();
        dup[2].label = "direct".into();
        assert!(response(dup, 0.8).check_shape().is_err());

        assert!(response(three_drafts(), 1.2).check_shape().is_err());
    }

    #[test]
    fn response_rejects_unknown_fields() {
        let json = r#"{
            "request_id": "r", "detected_tone": "friendly", "channel_applied": "slack",
            "drafts": [], "notes": "", "confidence_score": 0.5, "extra": true
        }"#;
        assert!(serde_json::from_str::<DraftResponse>(json).is_err());
    }
}
