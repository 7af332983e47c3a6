//! Base draft synthesis: three differently voiced drafts per channel.

use super::types::{Channel, DRAFT_LABELS, Draft};
use crate::text::{lower_first, with_terminal};

/// Words that suggest the sender is waiting on several documents or numbers.
const REPORT_VOCABULARY: &[&str] = &[
    "metrics", "reports", "figures", "numbers", "stats", "results", "slides",
];

/// Produce the Direct, Friendly and Action-oriented drafts.
pub fn base_drafts(message: &str, channel: Channel, phrase: Option<&str>) -> Vec<Draft> {
    let message = with_terminal(message.trim());
    let question = deadline_question(&message);

    let [direct, friendly, action] = match channel {
        Channel::Email => email(&message, question, phrase),
        Channel::Slack => slack(&message, question, phrase),
        Channel::Linkedin => linkedin(&message, question, phrase),
    };

    DRAFT_LABELS
        .iter()
        .zip([direct, friendly, action])
        .map(|(label, text)| Draft::new(*label, text))
        .collect()
}

/// Pick the closing question for the Action-oriented draft.
fn deadline_question(message: &str) -> &'static str {
    let mentions_reports = message
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| REPORT_VOCABULARY.contains(&word.to_lowercase().as_str()));
    if mentions_reports {
        "When do you need these by?"
    } else {
        "When do you need this by?"
    }
}

fn email(message: &str, question: &str, phrase: Option<&str>) -> [String; 3] {
    match phrase {
        Some(phrase) => [
            format!("Given this is for {phrase}, {}", lower_first(message)),
            format!("Thanks for sharing. {message} Happy to help with {phrase}."),
            format!("{message} For {phrase}, {}", lower_first(question)),
        ],
        None => [
            message.to_string(),
            format!("Thanks for sharing. {message}"),
            format!("{message} {question}"),
        ],
    }
}

fn slack(message: &str, question: &str, phrase: Option<&str>) -> [String; 3] {
    match phrase {
        Some(phrase) => [
            format!("Re {phrase}: {message}"),
            format!("Hey team, {} Appreciate the help on {phrase}!", lower_first(message)),
            format!("{message} Can we align on next steps for {phrase}? {question}"),
        ],
        None => [
            message.to_string(),
            format!("Hey team, {} Appreciate it!", lower_first(message)),
            format!("{message} Can we align on next steps? {question}"),
        ],
    }
}

fn linkedin(message: &str, question: &str, phrase: Option<&str>) -> [String; 3] {
    let cta = "If you're open to it, happy to connect and compare notes";
    match phrase {
        Some(phrase) => [
            format!("Given this is for {phrase}, {}", lower_first(message)),
            format!("Appreciate the perspective on {phrase}. {message}"),
            format!("{message} {question} {cta} on {phrase}."),
        ],
        None => [
            message.to_string(),
            format!("Appreciate the perspective. {message}"),
            format!("{message} {question} {cta}."),
        ],
    }
}
