//! Interactive chat loop.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::pipeline::{MessagePipeline, PipelineState, RejectReason, SendOutcome};
use crate::view;

use super::output::{print_chat, print_message, print_sessions, print_typing};

const BUSY: &str = "Still waiting for the previous reply.";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    New,
    List,
    Switch(String),
    Rename(String),
    Delete(Option<String>),
    Show,
    Export(PathBuf),
    Help,
    Quit,
    /// Text to send as a chat message.
    Send(String),
    /// A known command missing its argument; carries the usage line.
    Usage(&'static str),
    Unknown(String),
}

const HELP: &str = "\
/new              start a new chat
/list             list chats
/switch REF       switch to a chat (id, id prefix, or list number)
/rename TITLE     rename the current chat
/delete [REF]     delete a chat (defaults to the current one)
/show             print the current chat
/export PATH      write the current chat as HTML
/help             show this help
/quit             exit
Anything else is sent as a message. Start with // to send a leading /.";

/// Parse one line of input. Blank lines parse to `None`.
pub fn parse(line: &str) -> Option<ReplCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(escaped) = line.strip_prefix("//") {
        return Some(ReplCommand::Send(format!("/{escaped}")));
    }
    let Some(command) = line.strip_prefix('/') else {
        return Some(ReplCommand::Send(line.to_string()));
    };

    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, arg)| (name, arg.trim()));
    let arg = (!arg.is_empty()).then(|| arg.to_string());

    let parsed = match (name, arg) {
        ("new", _) => ReplCommand::New,
        ("list", _) => ReplCommand::List,
        ("switch", Some(reference)) => ReplCommand::Switch(reference),
        ("switch", None) => ReplCommand::Usage("/switch REF"),
        ("rename", Some(title)) => ReplCommand::Rename(title),
        ("rename", None) => ReplCommand::Usage("/rename TITLE"),
        ("delete", reference) => ReplCommand::Delete(reference),
        ("show", _) => ReplCommand::Show,
        ("export", Some(path)) => ReplCommand::Export(PathBuf::from(path)),
        ("export", None) => ReplCommand::Usage("/export PATH"),
        ("help" | "?", _) => ReplCommand::Help,
        ("quit" | "exit", _) => ReplCommand::Quit,
        (other, _) => ReplCommand::Unknown(other.to_string()),
    };
    Some(parsed)
}

/// Run the chat loop until `/quit` or end of input.
///
/// Sends run in their own task so commands keep working while a reply is
/// pending; outcomes come back over a channel.
pub async fn run(pipeline: MessagePipeline) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<SendOutcome>();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    {
        let store = pipeline.store().lock().await;
        print_chat(&view::project(&store, pipeline.state(), "", Utc::now()));
    }

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                match parse(&line) {
                    None => {}
                    Some(ReplCommand::Quit) => break,
                    Some(ReplCommand::Send(text)) => start_send(&pipeline, &tx, &text).await,
                    Some(command) => {
                        if let Err(e) = handle(&pipeline, command).await {
                            eprintln!("Error: {e:#}");
                        }
                    }
                }
            }
            Some(outcome) = rx.recv() => report(&pipeline, &outcome).await,
        }
    }

    // Let a pending reply land in the store before exiting.
    if pipeline.state() == PipelineState::Sending {
        if let Some(outcome) = rx.recv().await {
            report(&pipeline, &outcome).await;
        }
    }
    Ok(())
}

/// Start a send bound to the session that is current right now, so a
/// `/new` or `/switch` typed while it is pending cannot redirect it.
async fn start_send(
    pipeline: &MessagePipeline,
    tx: &mpsc::UnboundedSender<SendOutcome>,
    text: &str,
) {
    let store = pipeline.store().lock().await;
    if !view::project(&store, pipeline.state(), text, Utc::now()).send_enabled {
        if pipeline.state() == PipelineState::Sending {
            println!("{BUSY}");
        }
        return;
    }
    let session_id = store.current_id().to_string();

    match pipeline.begin(&session_id, text) {
        Ok(pending) => {
            let tx = tx.clone();
            tokio::spawn(async move {
                let _ = tx.send(pending.finish().await);
            });
            print_typing(&view::project(&store, pipeline.state(), "", Utc::now()));
        }
        Err(RejectReason::Busy) => println!("{BUSY}"),
        Err(_) => {}
    }
}

async fn handle(pipeline: &MessagePipeline, command: ReplCommand) -> Result<()> {
    let now = Utc::now();
    let mut store = pipeline.store().lock().await;

    match command {
        ReplCommand::New => {
            store.create_session();
            print_chat(&view::project(&store, pipeline.state(), "", now));
        }
        ReplCommand::List => {
            print_sessions(&view::project(&store, pipeline.state(), "", now));
        }
        ReplCommand::Switch(reference) => match store.resolve(&reference) {
            Some(id) => {
                store.switch_current(&id);
                print_chat(&view::project(&store, pipeline.state(), "", now));
            }
            None => println!("No chat matches '{reference}'."),
        },
        ReplCommand::Rename(title) => {
            let id = store.current_id().to_string();
            if store.rename_session(&id, &title) {
                println!("Renamed to '{}'.", title.trim());
            }
        }
        ReplCommand::Delete(reference) => {
            let id = match reference {
                Some(reference) => store.resolve(&reference),
                None => Some(store.current_id().to_string()),
            };
            match id {
                Some(id) => {
                    let title = store.get(&id).map(|s| s.title.clone()).unwrap_or_default();
                    store.delete_session(&id);
                    println!("Deleted '{title}'.");
                    print_chat(&view::project(&store, pipeline.state(), "", now));
                }
                None => println!("No chat matches that reference."),
            }
        }
        ReplCommand::Show => {
            print_chat(&view::project(&store, pipeline.state(), "", now));
        }
        ReplCommand::Export(path) => {
            if let Some(session) = store.current() {
                std::fs::write(&path, view::transcript_document(session, now))
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Wrote {}", path.display());
            }
        }
        ReplCommand::Help => println!("{HELP}"),
        ReplCommand::Usage(usage) => println!("Usage: {usage}"),
        ReplCommand::Unknown(name) => println!("Unknown command /{name}. Type /help for commands."),
        ReplCommand::Quit | ReplCommand::Send(_) => {}
    }
    Ok(())
}

/// Print the newest message of the session a send landed in.
async fn report(pipeline: &MessagePipeline, outcome: &SendOutcome) {
    match outcome {
        SendOutcome::Rejected(RejectReason::Busy) => println!("{BUSY}"),
        SendOutcome::Rejected(RejectReason::NoSession) => {
            println!("The chat was deleted before the message was sent.");
        }
        SendOutcome::Rejected(RejectReason::EmptyMessage) => {}
        SendOutcome::Replied { session_id } | SendOutcome::Failed { session_id, .. } => {
            let store = pipeline.store().lock().await;
            let Some(session) = store.get(session_id) else {
                return;
            };
            if session.id != store.current_id() {
                println!("(reply in '{}')", session.title);
            }
            if let Some(message) = session.last_message() {
                print_message(&view::render_message(message, Utc::now()));
            }
        }
    }
}
