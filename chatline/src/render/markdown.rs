//! Minimal markdown to HTML conversion for assistant replies.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::escape_html;

/// Marks a stashed code fragment. Stripped from input before rendering.
const STASH: char = '\u{1}';

struct Rules {
    fenced: Regex,
    inline_code: Regex,
    h3: Regex,
    h2: Regex,
    h1: Regex,
    bold: Regex,
    italic: Regex,
    list_item: Regex,
    list_run: Regex,
    stashed: Regex,
}

fn rules() -> &'static Rules {
    static RULES: OnceLock<Rules> = OnceLock::new();
    RULES.get_or_init(|| {
        let re = |pattern: &str| Regex::new(pattern).expect("static markdown pattern");
        Rules {
            fenced: re(r"(?s)```(?:[A-Za-z0-9_+-]*\n)?(.*?)```"),
            inline_code: re(r"`([^`\n]+)`"),
            h3: re(r"(?m)^### (.*)$"),
            h2: re(r"(?m)^## (.*)$"),
            h1: re(r"(?m)^# (.*)$"),
            bold: re(r"\*\*(.+?)\*\*"),
            italic: re(r"\*([^*\n]+?)\*"),
            list_item: re(r"(?m)^- (.*)$"),
            list_run: re(r"(?m)(?:^<li>.*</li>(?:\n|\z))+"),
            stashed: re("\u{1}(\\d+)\u{1}"),
        }
    })
}

/// Convert assistant markdown to HTML.
///
/// Supports fenced and inline code, `#`..`###` headers, bold, italic, and
/// `- ` lists; other newlines become `<br>`. Raw HTML in the input is
/// escaped, and code contents are left exactly as written.
pub fn markdown_to_html(text: &str) -> String {
    let rules = rules();
    let cleaned: String = text.chars().filter(|&c| c != STASH).collect();
    let escaped = escape_html(&cleaned);

    let mut stash: Vec<String> = Vec::new();
    let mut keep = |html: String| {
        stash.push(html);
        format!("{STASH}{}{STASH}", stash.len() - 1)
    };

    let html = rules
        .fenced
        .replace_all(&escaped, |caps: &Captures| {
            let body = &caps[1];
            let body = body.strip_suffix('\n').unwrap_or(body);
            keep(format!("<pre><code>{body}</code></pre>"))
        })
        .into_owned();
    let html = rules
        .inline_code
        .replace_all(&html, |caps: &Captures| keep(format!("<code>{}</code>", &caps[1])))
        .into_owned();

    let html = rules.h3.replace_all(&html, "<h3>$1</h3>");
    let html = rules.h2.replace_all(&html, "<h2>$1</h2>");
    let html = rules.h1.replace_all(&html, "<h1>$1</h1>");
    let html = rules.bold.replace_all(&html, "<strong>$1</strong>");
    let html = rules.italic.replace_all(&html, "<em>$1</em>");
    let html = rules.list_item.replace_all(&html, "<li>$1</li>");
    let html = rules.list_run.replace_all(&html, |caps: &Captures| {
        format!("<ul>{}</ul>", caps[0].lines().collect::<String>())
    });
    let html = html.replace('\n', "<br>");

    rules
        .stashed
        .replace_all(&html, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| stash.get(i).cloned())
                .unwrap_or_default()
        })
        .into_owned()
}
