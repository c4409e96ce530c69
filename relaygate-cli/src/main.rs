//! relaygate - operator CLI
//!
//! Inspect retry decisions for single outcomes, replay scripted failure
//! sequences through the retry executor, and probe a live upstream.

#![allow(clippy::print_stdout, reason = "CLI tool outputs to stdout")]

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod config_commands;
mod simulate;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    relaygate_core::modules::logger::init_logger(&cli.log_level)
        .map_err(|e| anyhow::anyhow!(e))?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Decide { status, body, attempt, json } => {
            commands::handle_decide(config_path, status, body.as_deref(), attempt, json)
        },
        Commands::Simulate { codes, accounts } => {
            simulate::handle_simulate(config_path, &codes, accounts).await
        },
        Commands::Probe { message, model, max_tokens } => {
            commands::handle_probe(config_path, &message, &model, max_tokens).await
        },
        Commands::Config(cmd) => commands::handle_config_command(config_path, cmd),
    }
}
