//! CLI argument parsing for sift.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Keyboard-driven launcher for the terminal", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (defaults to ~/.config/sift/config.json)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive launcher (default)
    Run {
        /// Initial input text
        #[arg(short, long, default_value = "")]
        text: String,
    },

    /// Send a single request to a plugin executable and print the reply
    Request {
        /// Plugin command line, e.g. "python3 calc.py"
        executable: String,

        /// Request action, e.g. "search"
        action: String,

        /// JSON payload; bare words are sent as strings
        payload: Option<String>,
    },

    /// Show the effective configuration and where it was loaded from
    Config,
}
