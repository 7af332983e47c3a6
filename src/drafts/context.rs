//! Context extraction: pulls a short grounding phrase out of free text.
//!
//! Purely lexical. A missing context and an unusable one both come back as
//! `None`, and callers omit any context embellishment in that case.

/// Leading filler stripped from context, longest first so "this is for"
/// wins over "for".
const FILLER_PREFIXES: &[&str] = &[
    "this is regarding",
    "this is about",
    "this is for",
    "it's regarding",
    "it's about",
    "it's for",
    "in relation to",
    "with regard to",
    "regarding",
    "context:",
    "about",
    "for",
    "re:",
    "re",
];

/// Phrases that carry no grounding on their own.
const DEGENERATE: &[&str] = &["this", "that", "it", "context"];

/// Longest phrase (in words) we weave into a draft.
const MAX_PHRASE_WORDS: usize = 6;

/// Extract a short lowercase phrase from optional context text.
pub fn extract_phrase(context: Option<&str>) -> Option<String> {
    let context = context?;

    // Only the first clause grounds the reply; the rest is usually detail.
    let clause = context
        .split(['\n', ',', ';', '.', '!', '?'])
        .map(str::trim)
        .find(|c| !c.is_empty())?;

    let mut phrase = clause.to_lowercase();
    while let Some(rest) = strip_filler(&phrase) {
        phrase = rest;
    }

    let phrase = phrase
        .split_whitespace()
        .take(MAX_PHRASE_WORDS)
        .collect::<Vec<_>>()
        .join(" ");
    let phrase = phrase
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .trim()
        .to_string();

    if phrase.is_empty() || DEGENERATE.contains(&phrase.as_str()) {
        return None;
    }
    Some(phrase)
}

fn strip_filler(text: &str) -> Option<String> {
    FILLER_PREFIXES.iter().find_map(|prefix| {
        let rest = text.strip_prefix(prefix)?;
        // "for" must not eat the front of "forecast".
        let at_boundary = prefix.ends_with(':')
            || rest.is_empty()
            || rest.starts_with(|c: char| c.is_whitespace() || c == ':');
        at_boundary.then(|| rest.trim_start_matches([' ', '\t', ':']).to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_without_context() {
        assert_eq!(extract_phrase(None), None);
        assert_eq!(extract_phrase(Some("   ")), None);
    }

    #[test]
    fn strips_filler_and_lowercases() {
        assert_eq!(
            extract_phrase(Some("This is for Q1 planning.")),
            Some("q1 planning".to_string())
        );
        assert_eq!(
            extract_phrase(Some("Regarding the board meeting")),
            Some("the board meeting".to_string())
        );
    }

    #[test]
    fn stacked_prefixes_are_all_removed() {
        assert_eq!(
            extract_phrase(Some("Re: regarding vendor renewal!")),
            Some("vendor renewal".to_string())
        );
    }

    #[test]
    fn prefix_only_matches_whole_words() {
        assert_eq!(
            extract_phrase(Some("forecast review")),
            Some("forecast review".to_string())
        );
        assert_eq!(
            extract_phrase(Some("aboutique launch")),
            Some("aboutique launch".to_string())
        );
    }

    #[test]
    fn degenerate_phrases_are_rejected() {
        assert_eq!(extract_phrase(Some("This is for this.")), None);
        assert_eq!(extract_phrase(Some("for")), None);
        assert_eq!(extract_phrase(Some("...")), None);
    }

    #[test]
    fn long_context_is_capped() {
        let phrase = extract_phrase(Some(
            "about the quarterly hiring plan for the platform team in Berlin",
        ))
        .unwrap();
        assert_eq!(phrase, "the quarterly hiring plan for the");
    }
}
