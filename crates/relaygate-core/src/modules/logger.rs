//! Logger setup.
//!
//! Installs a global `tracing` fmt subscriber. `RUST_LOG` wins over the
//! level passed in, so operators can raise verbosity per module
//! (e.g. `RUST_LOG=relaygate_core::retry=debug`).

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

use crate::error::{AppError, AppResult};

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logger(default_level: &str) -> AppResult<()> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(env.as_deref(), default_level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| AppError::Logger(e.to_string()))?;

    let _ = INSTALLED.set(());
    Ok(())
}

/// Filter from the env directives if they parse, else from `default_level`.
fn build_filter(env_directives: Option<&str>, default_level: &str) -> AppResult<EnvFilter> {
    if let Some(directives) = env_directives.filter(|d| !d.trim().is_empty()) {
        match EnvFilter::try_new(directives) {
            Ok(filter) => return Ok(filter),
            Err(e) => eprintln!("Ignoring invalid {}: {}", EnvFilter::DEFAULT_ENV, e),
        }
    }
    EnvFilter::try_new(default_level)
        .map_err(|e| AppError::Logger(format!("invalid log level '{}': {}", default_level, e)))
}
