//! Constraint evaluation and the single corrective pass.
//!
//! `adjust` runs each correction stage at most once, in a fixed order. It is
//! best-effort: conflicting constraints can still fail evaluation afterwards
//! and nothing retries.

use super::types::{Constraints, EvaluationResult, Violation};
use crate::text::{clamp_words, shorten, with_terminal, word_count};

/// Characters of width allowed per permitted word in the shorten stage.
const CHARS_PER_WORD: usize = 6;
const QUESTION_CLAUSE: &str = "What do you think?";

/// Check a draft against constraints. `None` passes everything.
pub fn evaluate(text: &str, constraints: Option<&Constraints>) -> EvaluationResult {
    let Some(constraints) = constraints else {
        return EvaluationResult {
            within_max_words: true,
            includes_question: true,
            avoids_phrases: true,
            violations: Vec::new(),
        };
    };

    let mut violations = Vec::new();

    let within_max_words = constraints
        .max_words
        .is_none_or(|max| word_count(text) <= max as usize);
    if !within_max_words {
        violations.push(Violation::MaxWords);
    }

    let includes_question = !constraints.must_include_question || text.contains('?');
    if !includes_question {
        violations.push(Violation::MustIncludeQuestion);
    }

    let lower = text.to_lowercase();
    let avoids_phrases = !constraints
        .phrases()
        .any(|phrase| lower.contains(&phrase.to_lowercase()));
    if !avoids_phrases {
        violations.push(Violation::AvoidPhrases);
    }

    EvaluationResult {
        within_max_words,
        includes_question,
        avoids_phrases,
        violations,
    }
}

/// Apply one corrective pass for whatever `evaluate` flags.
pub fn adjust(text: &str, constraints: Option<&Constraints>) -> String {
    let Some(constraints) = constraints else {
        return text.to_string();
    };

    let evaluation = evaluate(text, Some(constraints));
    let max_words = constraints.max_words.map(|m| m as usize);
    let mut current = text.to_string();

    if let Some(max) = max_words
        && evaluation.violated(Violation::MaxWords)
    {
        current = trim_to_word_limit(&current, max);
    }

    if evaluation.violated(Violation::MustIncludeQuestion) && !current.trim_end().ends_with('?') {
        let stem = current.trim();
        current = if stem.is_empty() {
            QUESTION_CLAUSE.to_string()
        } else {
            format!("{} {QUESTION_CLAUSE}", with_terminal(stem))
        };
    }

    // Literal, case-sensitive removal of the casing supplied by the caller.
    if evaluation.violated(Violation::AvoidPhrases) {
        for phrase in constraints.phrases() {
            current = current.replace(phrase, "").trim().to_string();
        }
    }

    // The question clause can push the text back over the limit.
    if let Some(max) = max_words {
        current = clamp_words(&current, max);
    }

    if constraints.must_include_question && !current.contains('?') {
        current = force_question(&current, max_words);
    }

    current
}

/// Last-resort question mark that never pushes the text past the limit.
fn force_question(text: &str, max_words: Option<usize>) -> String {
    let mut words: Vec<&str> = text.split_whitespace().collect();
    let at_limit = max_words.is_some_and(|max| words.len() >= max);
    match words.last_mut() {
        Some(last) if at_limit => {
            *last = "?";
            words.join(" ")
        }
        Some(_) => format!("{} ?", words.join(" ")),
        None => "?".to_string(),
    }
}

/// Drop the trailing sentence, clamp, shorten by width, then clamp again.
fn trim_to_word_limit(text: &str, max: usize) -> String {
    let sentences: Vec<&str> = text.split(". ").collect();
    let mut current = if sentences.len() > 1 {
        sentences[..sentences.len() - 1].join(". ").trim().to_string()
    } else {
        text.to_string()
    };

    current = clamp_words(&current, max);
    current = shorten(&current, max * CHARS_PER_WORD, "…");
    clamp_words(&current, max)
}
