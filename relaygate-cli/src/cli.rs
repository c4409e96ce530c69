use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "relaygate",
    about = "Relaygate - retry/backoff decisions for upstream LLM requests",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, env = "RELAYGATE_CONFIG", help = "Path to config.json")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Classify one failed attempt and print the retry decision")]
    Decide {
        #[arg(short, long, help = "HTTP status code of the attempt (0 = transport failure)")]
        status: u16,

        #[arg(short, long, help = "Error body returned with the status")]
        body: Option<String>,

        #[arg(
            short,
            long,
            default_value_t = 1,
            value_parser = clap::value_parser!(u32).range(1..),
            help = "1-based index of the attempt that failed"
        )]
        attempt: u32,

        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Run the retry executor against a scripted sequence of statuses")]
    Simulate {
        #[arg(
            required = true,
            help = "Statuses in attempt order, each optionally followed by ':<body>' (e.g. 529 400:'Invalid signature' 200)"
        )]
        codes: Vec<String>,

        #[arg(long, help = "Use N synthetic credentials instead of the configured pool")]
        accounts: Option<usize>,
    },

    #[command(about = "Send one real messages request through the retry executor")]
    Probe {
        #[arg(short, long, default_value = "ping", help = "User message to send")]
        message: String,

        #[arg(long, default_value = "claude-sonnet-4-5", help = "Model name")]
        model: String,

        #[arg(long, default_value_t = 16, help = "max_tokens for the request")]
        max_tokens: u32,
    },

    #[command(subcommand, about = "View or initialise configuration")]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    #[command(about = "Show the effective configuration")]
    Show {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Write a default configuration file")]
    Init {
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
}
