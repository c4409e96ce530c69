//! Scripted replay of upstream statuses through the retry executor.
//!
//! Each token is `<status>[:<body>]`. Status `0` stands for a transport
//! failure, any 2xx for success. Attempts past the end of the script succeed.
//! Delays are slept for real, so the elapsed column reflects the policy.

use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use std::path::Path;
use tokio::time::Instant;

use relaygate_core::modules::config as core_config;
use relaygate_core::retry::{decide, generate_trace_id, CancelSignal, TRANSPORT_STATUS};
use relaygate_core::{AttemptFailure, Classifier, Credential, CredentialPool, RetryExecutor};
use relaygate_types::{AttemptOutcome, Classification, RetryDecision};

use crate::commands::classify_input;

const DEFAULT_SYNTHETIC_ACCOUNTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedStep {
    pub status: u16,
    pub body: Option<String>,
}

impl ScriptedStep {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub fn parse_step(token: &str) -> Result<ScriptedStep> {
    let (status, body) = match token.split_once(':') {
        Some((status, body)) => (status, Some(body.to_string())),
        None => (token, None),
    };
    let status = status
        .trim()
        .parse::<u16>()
        .with_context(|| format!("invalid status '{}' in '{}'", status, token))?;
    Ok(ScriptedStep { status, body })
}

pub fn synthetic_credentials(count: usize) -> Vec<Credential> {
    (1..=count).map(|i| Credential::new(format!("acct-{i}"), format!("sk-synthetic-{i}"))).collect()
}

struct AttemptRow {
    attempt: u32,
    credential: String,
    status: u16,
    classification: Classification,
    decision: Option<RetryDecision>,
    elapsed_ms: u128,
}

fn action_cell(row: &AttemptRow) -> Cell {
    match row.decision {
        None => Cell::new("succeeded").fg(Color::Green),
        Some(d) if !d.should_retry => Cell::new("stop").fg(Color::Red),
        Some(d) if d.rotate_credential => {
            Cell::new(format!("retry in {}ms, rotate", d.delay_ms)).fg(Color::Yellow)
        },
        Some(d) => Cell::new(format!("retry in {}ms, same account", d.delay_ms)).fg(Color::Yellow),
    }
}

pub async fn handle_simulate(
    config_path: Option<&Path>,
    codes: &[String],
    accounts: Option<usize>,
) -> Result<()> {
    let config = core_config::load_config(config_path).map_err(|e| anyhow::anyhow!(e))?;
    let steps = codes.iter().map(|t| parse_step(t)).collect::<Result<Vec<_>>>()?;

    let credentials = match accounts {
        Some(0) => anyhow::bail!("--accounts must be at least 1"),
        Some(n) => synthetic_credentials(n),
        None if config.pool.credentials.is_empty() => {
            synthetic_credentials(DEFAULT_SYNTHETIC_ACCOUNTS)
        },
        None => config.pool.credentials.iter().map(Credential::from).collect(),
    };
    let pool = CredentialPool::new(credentials, config.pool.max_in_flight_per_credential)
        .map_err(|e| anyhow::anyhow!(e))?;

    let executor = RetryExecutor::new(config.retry.clone(), &config.classifier);
    let classifier = Classifier::new(&config.classifier);
    let trace_id = generate_trace_id();
    let started = Instant::now();
    let mut rows: Vec<AttemptRow> = Vec::new();

    let result = executor
        .run(&trace_id, &pool, &CancelSignal::never(), |credential, attempt| {
            let step = steps
                .get(attempt as usize - 1)
                .cloned()
                .unwrap_or(ScriptedStep { status: 200, body: None });
            let elapsed_ms = started.elapsed().as_millis();

            let outcome = if step.is_success() {
                rows.push(AttemptRow {
                    attempt,
                    credential: credential.id().to_string(),
                    status: step.status,
                    classification: Classification::Success,
                    decision: None,
                    elapsed_ms,
                });
                Ok(step.status)
            } else {
                let classification = classify_input(&classifier, step.status, step.body.as_deref());
                let decision = AttemptOutcome::try_new(classification, step.status, attempt)
                    .map(|o| decide(&o, executor.policy()));
                rows.push(AttemptRow {
                    attempt,
                    credential: credential.id().to_string(),
                    status: step.status,
                    classification,
                    decision,
                    elapsed_ms,
                });
                if step.status == TRANSPORT_STATUS {
                    Err(AttemptFailure::Transport {
                        message: "scripted transport failure".to_string(),
                        timed_out: false,
                    })
                } else {
                    Err(AttemptFailure::Http {
                        status: step.status,
                        body: Some(step.body.unwrap_or_default()),
                    })
                }
            };
            async move { outcome }
        })
        .await;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Attempt", "Credential", "Status", "Classification", "Action", "At"]);
    for row in &rows {
        table.add_row(vec![
            Cell::new(row.attempt),
            Cell::new(&row.credential),
            Cell::new(row.status),
            Cell::new(row.classification),
            action_cell(row),
            Cell::new(format!("{}ms", row.elapsed_ms)),
        ]);
    }
    println!("{table}");

    match result {
        Ok(execution) => println!(
            "{} Succeeded on attempt {} with {} after {}ms",
            "✓".green(),
            execution.attempts,
            execution.credential_id,
            started.elapsed().as_millis()
        ),
        Err(e) => println!("{} {}", "✗".red(), e),
    }

    let mut stats = Table::new();
    stats.load_preset(UTF8_FULL);
    stats.set_header(vec!["Credential", "Successes", "Failures", "Consecutive"]);
    for s in pool.stats() {
        stats.add_row(vec![
            Cell::new(&s.id),
            Cell::new(s.total_successes),
            Cell::new(s.total_failures),
            Cell::new(s.consecutive_failures),
        ]);
    }
    println!("{stats}");
    Ok(())
}
