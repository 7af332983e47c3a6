//! Lexical helpers shared by the formatter and the constraint engine.

/// Count whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split text into trimmed sentences.
///
/// A boundary is `.`, `!` or `?` followed by whitespace; the punctuation stays
/// with the sentence it ends.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if matches!(ch, '.' | '!' | '?')
            && chars.peek().is_some_and(|(_, next)| next.is_whitespace())
        {
            let end = idx + ch.len_utf8();
            push_trimmed(&mut sentences, &text[start..end]);
            start = end;
        }
    }
    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
}

/// Keep at most `max` words, rejoined with single spaces.
///
/// Text already within the limit is returned untouched, so clamping twice
/// never shortens further.
pub fn clamp_words(text: &str, max: usize) -> String {
    if word_count(text) <= max {
        return text.to_string();
    }
    text.split_whitespace().take(max).collect::<Vec<_>>().join(" ")
}

/// Collapse whitespace and fit the text into `width` characters, dropping
/// whole trailing words and appending `placeholder` when anything was cut.
pub fn shorten(text: &str, width: usize, placeholder: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let collapsed = words.join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let budget = width.saturating_sub(placeholder.chars().count());
    let mut kept = String::new();
    for word in words {
        let extra = if kept.is_empty() { 0 } else { 1 };
        if kept.chars().count() + extra + word.chars().count() > budget {
            break;
        }
        if !kept.is_empty() {
            kept.push(' ');
        }
        kept.push_str(word);
    }

    if kept.is_empty() {
        placeholder.trim_start().to_string()
    } else {
        format!("{kept}{placeholder}")
    }
}

/// Count words that carry letters or digits, skipping bullet markers and
/// emoji.
pub fn content_word_count(text: &str) -> usize {
    text.split_whitespace().filter(|w| is_content_word(w)).count()
}

fn is_content_word(word: &str) -> bool {
    word.chars().any(char::is_alphanumeric)
}

/// Cut after the `max`-th content word, keeping the original spacing and line
/// breaks of what remains, and append `marker`. Returns `None` if nothing
/// would be cut.
pub fn truncate_words(text: &str, max: usize, marker: &str) -> Option<String> {
    let mut seen = 0;
    let mut word_start = None;
    for (idx, ch) in text.char_indices() {
        match (ch.is_whitespace(), word_start) {
            (false, None) => word_start = Some(idx),
            (true, Some(start)) => {
                word_start = None;
                if is_content_word(&text[start..idx]) {
                    seen += 1;
                    if seen == max {
                        if text[idx..].trim().is_empty() {
                            return None;
                        }
                        return Some(format!("{}{marker}", &text[..idx]));
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Lowercase the first letter so a sentence can follow a leading clause.
///
/// Leaves "I", "I'm" and acronyms like "Q1" or "ASAP" alone.
pub fn lower_first(text: &str) -> String {
    let first_word = text.split_whitespace().next().unwrap_or_default();
    let letters: Vec<char> = first_word.chars().filter(|c| c.is_alphabetic()).collect();
    let is_pronoun = first_word == "I" || first_word.starts_with("I'") || first_word.starts_with("I’");
    let is_acronym = (letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()))
        || first_word.chars().skip(1).any(|c| c.is_ascii_digit() || c.is_uppercase());
    if is_pronoun || is_acronym {
        return text.to_string();
    }

    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Ensure the text ends with terminal punctuation.
pub fn with_terminal(text: &str) -> String {
    let trimmed = text.trim_end();
    if trimmed.is_empty() || trimmed.ends_with(['.', '?', '!', '…']) {
        trimmed.to_string()
    } else {
        format!("{trimmed}.")
    }
}
