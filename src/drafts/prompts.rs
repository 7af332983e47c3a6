//! Prompt templates for provider-backed drafting.

use super::types::DraftRequest;

/// System instruction: JSON only, exactly three distinct drafts.
pub const SYSTEM_PROMPT: &str = "You are Smart Reply, an assistant that returns ONLY valid JSON.\n\
- Output JSON and nothing else; no markdown, prefaces, or commentary.\n\
- Always produce exactly 3 drafts with distinct styles.\n\
- Obey the requested tone and channel etiquette; keep replies safe and professional.\n\
- Default to UK English spelling unless an explicit language override is provided.";

/// Resolve the language line for the prompt.
///
/// An explicit per-request flag wins; otherwise the service default applies.
pub fn language_preference(request: &DraftRequest, uk_default: bool) -> &'static str {
    let uk = request
        .options
        .as_ref()
        .and_then(|o| o.uk_english)
        .unwrap_or(uk_default);
    if uk {
        "UK English (default)"
    } else {
        "User-specified language"
    }
}

/// Build the user instruction for a request.
pub fn build_user_prompt(request: &DraftRequest, uk_default: bool) -> String {
    let mut constraint_lines = Vec::new();
    if let Some(constraints) = &request.constraints {
        if let Some(max) = constraints.max_words {
            constraint_lines.push(format!("- max_words: {max}"));
        }
        if constraints.must_include_question {
            constraint_lines.push("- must_include_question: true".to_string());
        }
        let phrases: Vec<&str> = constraints.phrases().collect();
        if !phrases.is_empty() {
            constraint_lines.push(format!("- avoid_phrases: {phrases:?}"));
        }
    }
    let constraint_block = if constraint_lines.is_empty() {
        "None".to_string()
    } else {
        constraint_lines.join("\n")
    };

    format!(
        "Generate reply drafts for the following input.\n\
         - channel: {channel}\n\
         - tone: {tone}\n\
         - language: {language}\n\
         - message: {message}\n\
         - context: {context}\n\
         - constraints:\n{constraint_block}\n\n\
         Schema:\n\
         {{\n  \
           \"request_id\": str,\n  \
           \"detected_tone\": str,\n  \
           \"channel_applied\": str,\n  \
           \"drafts\": [\n    {{\"label\": str, \"text\": str}}\n  ],\n  \
           \"notes\": str,\n  \
           \"confidence_score\": float\n\
         }}\n\
         Rules:\n\
         - Exactly 3 drafts; each draft must have a distinct style.\n\
         - Keep answers concise and appropriate for the channel.\n\
         - Respect all constraints and the specified language.\n\
         - Return JSON only.",
        channel = request.channel,
        tone = request.tone,
        language = language_preference(request, uk_default),
        message = request.incoming_message,
        context = request.context.as_deref().unwrap_or("None"),
    )
}
