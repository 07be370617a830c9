//! Text to HTML rendering for transcripts.
//!
//! User content only ever goes through [`escape_html`]. Assistant content is
//! markdown and goes through [`markdown_to_html`], which escapes first so
//! model output cannot smuggle raw tags either.

mod markdown;

pub use markdown::markdown_to_html;

use crate::models::MessageRole;

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render message content according to who wrote it.
pub fn render_content(role: MessageRole, content: &str) -> String {
    match role {
        MessageRole::User => escape_html(content),
        MessageRole::Assistant => markdown_to_html(content),
    }
}
