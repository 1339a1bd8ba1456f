//! Sift terminal launcher entry point.
//!
//! Starts the plugins declared in the config file and routes keyboard
//! input through the sift-core router, rendering with ratatui.

use anyhow::Result;
use clap::Parser;
use sift_core::config::{Config, Directories};

mod app;
mod cli;
mod colors;
mod commands;
mod logging;
mod run;
mod ui;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let dirs = Directories::new()?;
    let config_path = cli.config.clone().unwrap_or_else(|| dirs.config_file.clone());

    match cli.command {
        Some(Commands::Request {
            executable,
            action,
            payload,
        }) => {
            logging::setup_stderr_logging(cli.debug);
            commands::request(&executable, &action, payload.as_deref()).await
        }
        Some(Commands::Config) => {
            logging::setup_stderr_logging(cli.debug);
            commands::show_config(&config_path)
        }
        Some(Commands::Run { text }) => launch(cli.debug, &dirs, &config_path, text).await,
        None => launch(cli.debug, &dirs, &config_path, String::new()).await,
    }
}

async fn launch(
    debug: bool,
    dirs: &Directories,
    config_path: &std::path::Path,
    text: String,
) -> Result<()> {
    let _guard = logging::setup_file_logging(debug, &dirs.log_dir)?;
    let config = Config::load(config_path)?;
    run::run(&config, text).await
}
