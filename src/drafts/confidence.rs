//! Heuristic confidence scoring for a finished set of drafts.

use super::constraints::evaluate;
use super::types::{Constraints, Draft};
use crate::text::word_count;

const BASELINE: f64 = 0.70;
const FORMATTING_BONUS: f64 = 0.10;
const CONSTRAINTS_BONUS: f64 = 0.10;
const LENGTH_BONUS: f64 = 0.05;
const CONTEXT_BONUS: f64 = 0.05;
/// Ceiling unless constraints and context are both provably honoured.
const SOFT_CAP: f64 = 0.95;
/// Word count treated as reasonable when no limit was requested.
const DEFAULT_MAX_WORDS: usize = 160;

/// Signals the scorer needs beyond the drafts themselves.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs<'a> {
    pub drafts: &'a [Draft],
    pub constraints: Option<&'a Constraints>,
    /// Whether any formatting rule changed any draft.
    pub formatting_applied: bool,
    /// Extracted context phrase, if context was supplied and usable.
    pub context_phrase: Option<&'a str>,
}

/// Which bonuses applied, kept for the response notes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Confidence {
    pub score: f64,
    pub formatting: bool,
    pub constraints_met: bool,
    pub length_ok: bool,
    pub context_referenced: bool,
}

/// Combine the baseline and bonuses into a score in [0, 1], rounded to two
/// decimals.
pub fn score(inputs: ScoreInputs<'_>) -> Confidence {
    let ScoreInputs {
        drafts,
        constraints,
        formatting_applied,
        context_phrase,
    } = inputs;

    let constraints_met = constraints.is_some()
        && drafts
            .iter()
            .all(|d| evaluate(&d.text, constraints).passed());

    let limit = constraints
        .and_then(|c| c.max_words)
        .map_or(DEFAULT_MAX_WORDS, |max| max as usize);
    let length_ok = drafts.iter().all(|d| word_count(&d.text) <= limit);

    let context_referenced = context_phrase.is_some_and(|phrase| {
        let phrase = phrase.to_lowercase();
        drafts
            .iter()
            .all(|d| d.text.to_lowercase().contains(&phrase))
    });

    let mut raw = BASELINE;
    if formatting_applied {
        raw += FORMATTING_BONUS;
    }
    if constraints_met {
        raw += CONSTRAINTS_BONUS;
    }
    if length_ok {
        raw += LENGTH_BONUS;
    }
    if context_referenced {
        raw += CONTEXT_BONUS;
    }

    let cap = if constraints_met && context_referenced {
        1.0
    } else {
        SOFT_CAP
    };

    Confidence {
        score: round2(raw.clamp(0.0, cap)),
        formatting: formatting_applied,
        constraints_met,
        length_ok,
        context_referenced,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
