//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// chatline - chat sessions in the terminal, saved between runs
#[derive(Parser, Debug)]
#[command(name = "chatline")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to ~/.chatline/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Chat endpoint to send messages to
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Keep sessions in memory only; nothing is read from or written to disk
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Subcommand to execute (defaults to `chat`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive chat
    Chat {
        /// Start on a new chat instead of resuming the latest one
        #[arg(long)]
        new: bool,
    },

    /// Send one message and print the reply
    Send {
        /// Session to send to (id, id prefix, or list position)
        #[arg(short, long, conflicts_with = "new")]
        session: Option<String>,

        /// Send to a new session
        #[arg(long)]
        new: bool,

        /// Message to send
        #[arg(trailing_var_arg = true, required = true)]
        message: Vec<String>,
    },

    /// List sessions, most recently updated first
    List,

    /// Print the transcript of a session
    Show {
        /// Session to show (defaults to the most recent)
        session: Option<String>,
    },

    /// Create an empty session
    New,

    /// Rename a session
    Rename {
        /// Session to rename
        session: String,

        /// New title
        #[arg(trailing_var_arg = true, required = true)]
        title: Vec<String>,
    },

    /// Delete a session
    Delete {
        /// Session to delete
        session: String,
    },

    /// Write a session transcript as an HTML page
    Export {
        /// Session to export (defaults to the most recent)
        session: Option<String>,

        /// Output file
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Run the chat relay server
    Serve {
        /// Port to listen on (defaults to the configured relay port)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

impl Cli {
    /// Whether this invocation runs the relay server.
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Some(Commands::Serve { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_command_means_chat() {
        let cli = Cli::try_parse_from(["chatline"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.ephemeral);
    }

    #[test]
    fn send_joins_trailing_words() {
        let cli =
            Cli::try_parse_from(["chatline", "--ephemeral", "send", "-s", "2", "hello", "there"])
                .unwrap();
        assert!(cli.ephemeral);
        match cli.command {
            Some(Commands::Send {
                session,
                new,
                message,
            }) => {
                assert_eq!(session.as_deref(), Some("2"));
                assert!(!new);
                assert_eq!(message, vec!["hello", "there"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn send_rejects_session_with_new() {
        assert!(Cli::try_parse_from(["chatline", "send", "-s", "1", "--new", "hi"]).is_err());
    }

    #[test]
    fn export_requires_output() {
        assert!(Cli::try_parse_from(["chatline", "export"]).is_err());
        let cli = Cli::try_parse_from(["chatline", "export", "1", "--out", "t.html"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Export { .. })));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["chatline", "serve", "--backend-url", "http://x"]).unwrap();
        assert!(cli.is_serve());
        assert_eq!(cli.backend_url.as_deref(), Some("http://x"));
    }
}
