//! Title derivation from a session's first message.

use crate::models::PLACEHOLDER_TITLE;

const TITLE_WORDS: usize = 6;
const TITLE_MAX_CHARS: usize = 30;
const ELLIPSIS: &str = "...";

/// Derive a session title from the first user message.
///
/// Takes the first six whitespace-separated words joined by single spaces.
/// Anything longer than 30 characters is cut to 30 and gets `...` appended.
pub fn derive_title(text: &str) -> String {
    let words = text
        .split_whitespace()
        .take(TITLE_WORDS)
        .collect::<Vec<_>>()
        .join(" ");

    if words.is_empty() {
        return PLACEHOLDER_TITLE.to_string();
    }

    if words.chars().count() > TITLE_MAX_CHARS {
        let mut cut: String = words.chars().take(TITLE_MAX_CHARS).collect();
        cut.push_str(ELLIPSIS);
        cut
    } else {
        words
    }
}
