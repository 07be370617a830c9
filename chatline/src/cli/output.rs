//! Terminal output for sessions and transcripts.

use std::fmt::Write as _;

use crate::models::MessageRole;
use crate::view::{ChatView, RenderedMessage};

pub const WELCOME: &str = "How can I help you today? Type a message, or /help for commands.";
pub const TYPING: &str = "Assistant is typing...";

/// Print the session list as a numbered table; `*` marks the current one.
pub fn print_sessions(view: &ChatView) {
    println!("{:<4} {:<36} {:<36} {:<10}", "#", "ID", "TITLE", "UPDATED");
    println!("{}", "-".repeat(88));

    for (i, entry) in view.sessions.iter().enumerate() {
        let marker = if entry.active { "*" } else { " " };
        println!(
            "{marker}{:<3} {:<36} {:<36} {:<10}",
            i + 1,
            entry.id,
            truncate(&entry.title, 34),
            entry.updated_label,
        );
    }
}

/// Print the current chat: title, then the welcome line or the transcript.
pub fn print_chat(view: &ChatView) {
    print!("{}", format_chat(view));
}

pub fn print_message(message: &RenderedMessage) {
    print!("{}", format_message(message));
}

/// Print the pending-reply marker if a reply is pending.
pub fn print_typing(view: &ChatView) {
    if view.typing {
        println!("{TYPING}");
    }
}

fn format_chat(view: &ChatView) -> String {
    let mut out = format!("== {} ==\n", view.title);
    if view.welcome {
        let _ = writeln!(out, "{WELCOME}");
    } else {
        for message in &view.transcript {
            out.push_str(&format_message(message));
        }
    }
    if view.typing {
        let _ = writeln!(out, "{TYPING}");
    }
    out
}

fn format_message(message: &RenderedMessage) -> String {
    let who = match message.role {
        MessageRole::User => "You",
        MessageRole::Assistant => "Assistant",
    };
    format!("[{who}] {}\n{}\n\n", message.time_label, message.text)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max - 1).collect();
        format!("{head}…")
    } else {
        text.to_string()
    }
}
