//! Channel formatting: ordered, idempotent text rules per channel.
//!
//! Each rule is a pure `fn(&str) -> (String, bool)` reporting whether it
//! changed the text. A channel's score is the fraction of its rule slots that
//! fired, so formatting already-formatted text scores 0.

use std::sync::LazyLock;

use regex::Regex;

use super::types::Channel;
use crate::text::{content_word_count, split_sentences, truncate_words, with_terminal, word_count};

type Rule = fn(&str) -> (String, bool);

const EMAIL_GREETING: &str = "Hi there,";
const EMAIL_SIGN_OFF: &str = "Best regards";
const SLACK_MAX_WORDS: usize = 60;
const SLACK_EMOJI: &[&str] = &["🙂", "👍"];
const KNOWN_EMOJI: &[char] = &['😀', '🙂', '👍', '🙏', '🤝', '✨', '🎯', '✅'];
const LINKEDIN_PARAGRAPH_WORDS: usize = 50;
const LINKEDIN_MAX_PARAGRAPHS: usize = 3;
const LINKEDIN_CTA: &str = "If you're open to it, happy to chat and compare notes.";

static GREETING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(hi|hello|dear)\b").expect("static regex"));
static CLOSING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(regards|cheers|sincerely|thanks)[,.!]?$").expect("static regex")
});
static CTA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(connect|chat|talk|let me know)").expect("static regex")
});

/// Format text for a channel given by name.
///
/// Unrecognised channel names are treated as an identity channel: the text is
/// returned unchanged with a score of 0.
pub fn apply_channel_format(channel: &str, text: &str, emoji: bool) -> (String, f64) {
    match channel.parse::<Channel>() {
        Ok(channel) => format_for(channel, text, emoji),
        Err(_) => (text.to_string(), 0.0),
    }
}

/// Format text for a known channel, returning the text and a score in [0, 1].
pub fn format_for(channel: Channel, text: &str, emoji: bool) -> (String, f64) {
    match channel {
        Channel::Email => {
            let (formatted, applied) =
                run_rules(text, &[ensure_greeting, ensure_blank_lines, ensure_sign_off]);
            (normalize_terminal_punctuation(&formatted), score(applied, 3))
        }
        Channel::Slack => {
            let (mut formatted, mut applied) =
                run_rules(text, &[bullets_from_sentences, truncate_slack]);
            if emoji {
                let (with_emoji, changed) = add_emoji(&formatted);
                formatted = with_emoji;
                applied += usize::from(changed);
            }
            (formatted, score(applied, 3))
        }
        Channel::Linkedin => {
            let (formatted, applied) = run_rules(text, &[split_paragraphs, ensure_cta]);
            (formatted, score(applied, 2))
        }
    }
}

fn run_rules(text: &str, rules: &[Rule]) -> (String, usize) {
    rules
        .iter()
        .fold((text.to_string(), 0), |(current, applied), rule| {
            let (next, changed) = rule(&current);
            (next, applied + usize::from(changed))
        })
}

fn score(applied: usize, slots: usize) -> f64 {
    applied as f64 / slots as f64
}

// ── Email ───────────────────────────────────────────────────────────────

fn ensure_greeting(text: &str) -> (String, bool) {
    let trimmed = text.trim();
    if GREETING_RE.is_match(trimmed) {
        return (text.to_string(), false);
    }
    (format!("{EMAIL_GREETING}\n\n{trimmed}"), true)
}

/// Turn every lone line break into a paragraph break.
fn ensure_blank_lines(text: &str) -> (String, bool) {
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let has_lone_break = lines
        .windows(2)
        .any(|pair| !pair[0].is_empty() && !pair[1].is_empty());
    if !has_lone_break {
        return (text.to_string(), false);
    }
    let paragraphs: Vec<&str> = lines.into_iter().filter(|l| !l.is_empty()).collect();
    (paragraphs.join("\n\n"), true)
}

fn ensure_sign_off(text: &str) -> (String, bool) {
    if ends_with_sign_off(text) {
        return (text.to_string(), false);
    }
    let body = with_terminal(text.trim());
    (format!("{body}\n\n{EMAIL_SIGN_OFF}"), true)
}

/// Whether the last non-empty line ends with a closing word.
fn ends_with_sign_off(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .is_some_and(|line| CLOSING_RE.is_match(line))
}

/// Append `.` unless the text already ends in `.`, `?` or `!`. A trailing
/// sign-off block is left as written.
pub fn normalize_terminal_punctuation(text: &str) -> String {
    if ends_with_sign_off(text) {
        return text.trim_end().to_string();
    }
    with_terminal(text)
}

// ── Slack ───────────────────────────────────────────────────────────────

fn bullets_from_sentences(text: &str) -> (String, bool) {
    if is_bulleted(text) {
        return (text.to_string(), false);
    }
    let sentences = chat_sentences(text);
    if sentences.len() < 2 {
        return (text.to_string(), false);
    }
    // One line per bullet, so a wrapped sentence cannot leave an unbulleted
    // continuation line behind.
    let bullets = sentences
        .iter()
        .map(|s| {
            let words: Vec<&str> = s.split_whitespace().collect();
            let words = match words.first() {
                Some(&"-") => &words[1..],
                _ => &words[..],
            };
            format!("- {}", words.join(" "))
        })
        .collect::<Vec<_>>()
        .join("\n");
    (bullets, true)
}

/// Sentences with no letters or digits (a trailing emoji run) stay attached
/// to the sentence before them.
fn chat_sentences(text: &str) -> Vec<String> {
    let mut sentences: Vec<String> = Vec::new();
    for sentence in split_sentences(text) {
        let has_content = sentence.chars().any(char::is_alphanumeric);
        match sentences.last_mut() {
            Some(last) if !has_content => {
                last.push(' ');
                last.push_str(&sentence);
            }
            _ => sentences.push(sentence),
        }
    }
    sentences
}

fn is_bulleted(text: &str) -> bool {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty()).peekable();
    lines.peek().is_some() && lines.all(|l| l.trim_start().starts_with("- "))
}

fn truncate_slack(text: &str) -> (String, bool) {
    if content_word_count(text) <= SLACK_MAX_WORDS {
        return (text.to_string(), false);
    }
    match truncate_words(text, SLACK_MAX_WORDS, "…") {
        Some(cut) => (cut, true),
        None => (text.to_string(), false),
    }
}

fn add_emoji(text: &str) -> (String, bool) {
    if text.contains(KNOWN_EMOJI) {
        return (text.to_string(), false);
    }
    (format!("{} {}", text.trim_end(), SLACK_EMOJI.join(" ")), true)
}

// ── LinkedIn ────────────────────────────────────────────────────────────

fn split_paragraphs(text: &str) -> (String, bool) {
    if text.contains("\n\n") {
        return (text.to_string(), false);
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for sentence in split_sentences(text) {
        current.push(sentence);
        let words: usize = current.iter().map(|s| word_count(s)).sum();
        if words >= LINKEDIN_PARAGRAPH_WORDS && chunks.len() < LINKEDIN_MAX_PARAGRAPHS - 1 {
            chunks.push(current.join(" "));
            current.clear();
        }
    }
    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    if chunks.len() < 2 {
        return (text.to_string(), false);
    }
    (chunks.join("\n\n"), true)
}

fn ensure_cta(text: &str) -> (String, bool) {
    if CTA_RE.is_match(text) {
        return (text.to_string(), false);
    }
    let body = with_terminal(text.trim());
    // A single block gets the CTA as its own paragraph; otherwise it joins
    // the last one so the paragraph cap holds.
    let joined = if body.contains("\n\n") {
        format!("{body} {LINKEDIN_CTA}")
    } else {
        format!("{body}\n\n{LINKEDIN_CTA}")
    };
    (joined, true)
}
