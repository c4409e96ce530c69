use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use std::path::Path;

use relaygate_core::modules::config as core_config;
use relaygate_core::retry::{
    cancellation, classify_transport, decide, decision_messages, generate_trace_id,
    TRANSPORT_STATUS,
};
use relaygate_core::{Classifier, CredentialPool, RetryExecutor, UpstreamClient};
use relaygate_types::{AttemptOutcome, Classification, RetryDecision};

use crate::cli::ConfigCommands;

mod config_commands_impl {
    pub use crate::config_commands::*;
}

pub fn handle_config_command(config_path: Option<&Path>, cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show { json } => config_commands_impl::show_config(config_path, json),
        ConfigCommands::Init { force } => config_commands_impl::init_config(config_path, force),
    }
}

/// Classify a status/body pair the way the executor does.
///
/// A missing body is treated as an empty one, not as an unreadable one.
pub fn classify_input(classifier: &Classifier, status: u16, body: Option<&str>) -> Classification {
    if status == TRANSPORT_STATUS {
        classify_transport()
    } else {
        classifier.classify(status, Some(body.unwrap_or("")))
    }
}

pub fn handle_decide(
    config_path: Option<&Path>,
    status: u16,
    body: Option<&str>,
    attempt: u32,
    json: bool,
) -> Result<()> {
    let config = core_config::load_config(config_path).map_err(|e| anyhow::anyhow!(e))?;
    let classifier = Classifier::new(&config.classifier);

    let classification = classify_input(&classifier, status, body);
    let outcome = AttemptOutcome::try_new(classification, status, attempt)
        .context("attempt index must be at least 1")?;
    let decision = decide(&outcome, &config.retry);

    if json {
        println!("{}", serde_json::to_string_pretty(&decision_report(&outcome, &decision))?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec![Cell::new("Status"), Cell::new(status)]);
    table.add_row(vec![
        Cell::new("Attempt"),
        Cell::new(format!("{}/{}", attempt, config.retry.max_attempts)),
    ]);
    table.add_row(vec![Cell::new("Classification"), Cell::new(classification)]);
    table.add_row(vec![Cell::new("Should retry"), retry_cell(decision.should_retry)]);
    table.add_row(vec![Cell::new("Delay"), Cell::new(format!("{}ms", decision.delay_ms))]);
    table.add_row(vec![Cell::new("Backoff"), Cell::new(decision.backoff_kind)]);
    table.add_row(vec![Cell::new("Rotate credential"), Cell::new(decision.rotate_credential)]);
    println!("{table}");

    let lines = decision_messages(&outcome, &decision, config.retry.max_attempts);
    if !lines.is_empty() {
        println!("\n{}", "Log lines:".cyan().bold());
        for (level, message) in lines {
            println!("  {:>5} {}", level, message);
        }
    }
    Ok(())
}

fn retry_cell(should_retry: bool) -> Cell {
    if should_retry {
        Cell::new("yes").fg(Color::Yellow)
    } else {
        Cell::new("no").fg(Color::Red)
    }
}

fn decision_report(outcome: &AttemptOutcome, decision: &RetryDecision) -> serde_json::Value {
    serde_json::json!({
        "status": outcome.raw_status_code(),
        "attempt": outcome.attempt_index(),
        "classification": outcome.classification(),
        "decision": decision,
    })
}

pub async fn handle_probe(
    config_path: Option<&Path>,
    message: &str,
    model: &str,
    max_tokens: u32,
) -> Result<()> {
    let config = core_config::load_config(config_path).map_err(|e| anyhow::anyhow!(e))?;
    let pool = CredentialPool::from_config(&config.pool).map_err(|e| anyhow::anyhow!(e))?;
    if pool.is_empty() {
        anyhow::bail!("No credentials configured; add entries under pool.credentials");
    }

    let client = UpstreamClient::new(&config.upstream).map_err(|e| anyhow::anyhow!(e))?;
    let executor = RetryExecutor::new(config.retry.clone(), &config.classifier);
    let trace_id = generate_trace_id();

    let (handle, signal) = cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, cancelling probe");
            handle.cancel();
        }
    });

    let body = serde_json::json!({
        "model": model,
        "max_tokens": max_tokens,
        "messages": [{"role": "user", "content": message}],
    });

    println!(
        "{} {} ({} credentials, trace {})",
        "Probing".cyan(),
        client.messages_url(),
        pool.len(),
        trace_id
    );

    let execution = executor
        .run(&trace_id, &pool, &signal, |credential, _attempt| {
            let client = &client;
            let body = &body;
            async move { client.send_messages(&credential, body).await }
        })
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    println!(
        "{} Succeeded on attempt {} with credential {}",
        "✓".green(),
        execution.attempts,
        execution.credential_id.green()
    );
    println!("{}", serde_json::to_string_pretty(&execution.value)?);
    Ok(())
}
