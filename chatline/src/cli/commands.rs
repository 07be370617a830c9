//! CLI command execution.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;

use crate::backend::HttpBackend;
use crate::config::Config;
use crate::pipeline::{MessagePipeline, PipelineState, SendOutcome};
use crate::relay;
use crate::session::SessionStore;
use crate::storage::{JsonFileStorage, MemoryStorage, SessionStorage};
use crate::view;

use super::args::{Cli, Commands};
use super::output::{print_chat, print_message, print_sessions};
use super::repl;

/// Load configuration and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = &cli.backend_url {
        config.backend_url.clone_from(url);
    }
    Ok(config)
}

/// Open the session store on disk, or in memory with `--ephemeral`.
fn open_store(ephemeral: bool, config: &Config, fresh: bool) -> Result<SessionStore> {
    let storage: Box<dyn SessionStorage> = if ephemeral {
        Box::new(MemoryStorage::new())
    } else {
        let dir = config.data_dir().context("Failed to locate data directory")?;
        let storage = JsonFileStorage::in_dir(&dir);
        tracing::debug!(path = %storage.path().display(), "Using session file");
        Box::new(storage)
    };
    Ok(if fresh {
        SessionStore::open_fresh(storage)
    } else {
        SessionStore::open(storage)
    })
}

fn build_pipeline(config: &Config, store: SessionStore) -> Result<MessagePipeline> {
    let backend = HttpBackend::new(&config.backend_url, config.request_timeout())
        .context("Failed to build HTTP client")?;
    tracing::debug!(url = backend.url(), "Using backend");
    Ok(MessagePipeline::new(store.into_shared(), Arc::new(backend)))
}

/// Resolve an optional session reference, defaulting to the current session.
fn resolve_or_current(store: &SessionStore, reference: Option<&str>) -> Result<String> {
    match reference {
        Some(reference) => resolve(store, reference),
        None => Ok(store.current_id().to_string()),
    }
}

fn resolve(store: &SessionStore, reference: &str) -> Result<String> {
    match store.resolve(reference) {
        Some(id) => Ok(id),
        None => bail!("No session matches '{reference}'"),
    }
}

// === Command Execution ===

pub async fn execute(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let open = |fresh: bool| open_store(cli.ephemeral, &config, fresh);

    match cli.command {
        None => chat(&config, open(false)?).await,
        Some(Commands::Chat { new }) => chat(&config, open(new)?).await,
        Some(Commands::Send {
            session,
            new,
            message,
        }) => {
            let message = message.join(" ");
            if message.trim().is_empty() {
                bail!("Message is required for send command");
            }
            let mut store = open(false)?;
            let target = if new {
                Some(store.create_session().id.clone())
            } else {
                session.map(|reference| resolve(&store, &reference)).transpose()?
            };
            send_once(&config, store, target.as_deref(), &message).await
        }
        Some(Commands::List) => {
            let store = open(false)?;
            print_sessions(&view::project(&store, PipelineState::Idle, "", Utc::now()));
            Ok(())
        }
        Some(Commands::Show { session }) => {
            let mut store = open(false)?;
            let id = resolve_or_current(&store, session.as_deref())?;
            store.switch_current(&id);
            print_chat(&view::project(&store, PipelineState::Idle, "", Utc::now()));
            Ok(())
        }
        Some(Commands::New) => {
            let mut store = open(false)?;
            println!("{}", store.create_session().id);
            Ok(())
        }
        Some(Commands::Rename { session, title }) => {
            let mut store = open(false)?;
            let id = resolve(&store, &session)?;
            let title = title.join(" ");
            if !store.rename_session(&id, &title) {
                bail!("Title must not be blank");
            }
            println!("Renamed {id} to '{}'", title.trim());
            Ok(())
        }
        Some(Commands::Delete { session }) => {
            let mut store = open(false)?;
            let id = resolve(&store, &session)?;
            store.delete_session(&id);
            println!("Deleted {id}");
            Ok(())
        }
        Some(Commands::Export { session, out }) => {
            let store = open(false)?;
            let id = resolve_or_current(&store, session.as_deref())?;
            let Some(session) = store.get(&id) else {
                bail!("No session matches '{id}'");
            };
            std::fs::write(&out, view::transcript_document(session, Utc::now()))
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Wrote {}", out.display());
            Ok(())
        }
        Some(Commands::Serve { port }) => {
            let mut relay_config = config.relay.clone();
            if let Some(port) = port {
                relay_config.port = port;
            }
            relay::start_server(relay_config).await
        }
    }
}

async fn chat(config: &Config, store: SessionStore) -> Result<()> {
    let pipeline = build_pipeline(config, store)?;
    repl::run(pipeline).await
}

async fn send_once(
    config: &Config,
    store: SessionStore,
    session_id: Option<&str>,
    message: &str,
) -> Result<()> {
    let pipeline = build_pipeline(config, store)?;
    let outcome = match session_id {
        Some(id) => pipeline.send_to(id, message).await,
        None => pipeline.send(message).await,
    };

    let store = pipeline.store().lock().await;
    let reply = outcome
        .session_id()
        .and_then(|id| store.get(id))
        .and_then(|session| session.last_message());
    if let Some(reply) = reply {
        print_message(&view::render_message(reply, Utc::now()));
    }

    match outcome {
        SendOutcome::Replied { .. } => Ok(()),
        SendOutcome::Failed { reason, .. } => bail!("Backend call failed: {reason}"),
        SendOutcome::Rejected(reason) => bail!("Message not sent: {reason:?}"),
    }
}
