//! CLI argument parsing module.

mod args;
mod commands;
mod output;
mod repl;

pub use args::Cli;
pub use commands::execute;
