use anyhow::Result;
use colored::Colorize;
use std::path::{Path, PathBuf};

use relaygate_core::modules::config as core_config;
use relaygate_types::RelayConfig;

fn resolve_path(config_path: Option<&Path>) -> Result<PathBuf> {
    match config_path {
        Some(p) => Ok(p.to_path_buf()),
        None => core_config::default_config_path().map_err(|e| anyhow::anyhow!(e)),
    }
}

pub fn show_config(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = core_config::load_config(config_path).map_err(|e| anyhow::anyhow!(e))?;

    if json {
        let mut redacted = config.clone();
        for spec in &mut redacted.pool.credentials {
            spec.secret = spec.masked_secret();
        }
        println!("{}", serde_json::to_string_pretty(&redacted)?);
        return Ok(());
    }

    print_summary(&config);
    Ok(())
}

fn print_summary(config: &RelayConfig) {
    let retry = &config.retry;
    println!("{}", "Retry Policy:".cyan().bold());
    println!("  Max attempts: {}", retry.max_attempts);
    println!("  Fixed delay: {}ms", retry.fixed_delay_ms);
    println!(
        "  Exponential: base {}ms x{} (cap {}ms)",
        retry.base_backoff_ms, retry.backoff_multiplier, retry.max_backoff_ms
    );

    println!("{}", "Classifier:".cyan().bold());
    println!("  Signature patterns: {}", config.classifier.signature_patterns.len());
    println!("  Signature error codes: {}", config.classifier.signature_error_codes.len());

    println!("{}", "Upstream:".cyan().bold());
    println!("  Base URL: {}", config.upstream.base_url);
    println!("  Timeout: {}s", config.upstream.request_timeout_secs);

    println!("{}", "Credentials:".cyan().bold());
    if config.pool.credentials.is_empty() {
        println!("  {}", "none configured".yellow());
    }
    for spec in &config.pool.credentials {
        println!("  {} {}", spec.id, spec.masked_secret());
    }
}

pub fn init_config(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = resolve_path(config_path)?;
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    core_config::save_config(&path, &RelayConfig::default()).map_err(|e| anyhow::anyhow!(e))?;
    println!("{} Wrote default config to {}", "✓".green(), path.display());
    Ok(())
}
