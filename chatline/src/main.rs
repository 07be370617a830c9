//! chatline - chat sessions in the terminal.
//!
//! Architecture:
//! - Sessions live in a JSON file under ~/.chatline and are rewritten after
//!   every change
//! - Each message goes to a completion backend over HTTP, one message per
//!   request with no earlier turns
//! - `chatline serve` runs the relay that backend requests usually go to

mod backend;
mod cli;
mod config;
mod models;
mod pipeline;
mod relay;
mod render;
mod session;
mod storage;
mod view;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{execute, Cli};

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(if cli.is_serve() { "info" } else { "warn" });
    execute(cli).await
}
