//! View projection: what the interface should show, derived from the store.
//!
//! Nothing here mutates the store and nothing is cached; callers project
//! again after every change.

mod time;

pub use time::relative_label;

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::models::{Message, MessageRole, Session};
use crate::pipeline::PipelineState;
use crate::render::{escape_html, render_content};
use crate::session::SessionStore;

/// One row of the session list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    pub id: String,
    pub title: String,
    pub updated_label: String,
    pub active: bool,
}

/// One transcript entry, already rendered to HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub role: MessageRole,
    /// Content as written, for plain-text surfaces.
    pub text: String,
    pub html: String,
    pub time_label: String,
}

/// Everything the interface needs to draw itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatView {
    /// Title of the current session.
    pub title: String,
    /// Show the welcome screen instead of a transcript.
    pub welcome: bool,
    /// Sessions, most recently updated first.
    pub sessions: Vec<SessionEntry>,
    /// Transcript of the current session.
    pub transcript: Vec<RenderedMessage>,
    /// A reply is pending.
    pub typing: bool,
    /// The send control accepts input.
    pub send_enabled: bool,
}

/// Whether the send control should be enabled.
pub fn send_enabled(input: &str, state: PipelineState) -> bool {
    !input.trim().is_empty() && state == PipelineState::Idle
}

/// Project the store into a [`ChatView`].
pub fn project(
    store: &SessionStore,
    state: PipelineState,
    input: &str,
    now: DateTime<Utc>,
) -> ChatView {
    let current = store.current();

    let sessions = store
        .list_sorted()
        .into_iter()
        .map(|s| SessionEntry {
            id: s.id.clone(),
            title: s.title.clone(),
            updated_label: relative_label(s.updated_at, now),
            active: s.id == store.current_id(),
        })
        .collect();

    ChatView {
        title: current.map(|s| s.title.clone()).unwrap_or_default(),
        welcome: current.is_none_or(Session::is_empty),
        sessions,
        transcript: current.map(|s| render_transcript(s, now)).unwrap_or_default(),
        typing: state == PipelineState::Sending,
        send_enabled: send_enabled(input, state),
    }
}

/// Render every message of `session`, oldest first.
pub fn render_transcript(session: &Session, now: DateTime<Utc>) -> Vec<RenderedMessage> {
    session
        .messages
        .iter()
        .map(|m| render_message(m, now))
        .collect()
}

pub fn render_message(message: &Message, now: DateTime<Utc>) -> RenderedMessage {
    RenderedMessage {
        role: message.role,
        text: message.content.clone(),
        html: render_content(message.role, &message.content),
        time_label: relative_label(message.timestamp, now),
    }
}

/// A standalone HTML page for one session's transcript.
pub fn transcript_document(session: &Session, now: DateTime<Utc>) -> String {
    let title = escape_html(&session.title);
    let mut body = String::new();
    for message in render_transcript(session, now) {
        let _ = write!(
            body,
            "<div class=\"message {role}\">\n<div class=\"message-text\">{html}</div>\n<div class=\"message-time\">{time}</div>\n</div>\n",
            role = message.role,
            html = message.html,
            time = message.time_label,
        );
    }
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n{body}</body>\n</html>\n"
    )
}
