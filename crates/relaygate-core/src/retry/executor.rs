//! Retry loop for one logical request.
//!
//! Each call to [`RetryExecutor::run`] is one logical request: the attempt
//! index starts at 1 and only ever increases inside that call. Run several
//! requests concurrently by spawning one task per request; backoff sleeps are
//! `tokio::time::sleep` and never block other tasks.

use relaygate_types::{AttemptOutcome, Classification, ClassifierConfig, PoolError, RetryPolicy};
use std::collections::HashSet;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{classify::classify_transport, decide, log_decision, Classifier, TRANSPORT_STATUS};
use crate::credentials::{Credential, CredentialPool};

/// Why an attempt did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// Upstream answered with a non-success status. `body` is `None` when it
    /// could not be read.
    Http { status: u16, body: Option<String> },
    /// No HTTP response at all (connect error, timeout, reset).
    Transport { message: String, timed_out: bool },
}

pub type AttemptResult<T> = Result<T, AttemptFailure>;

/// Terminal outcomes of a logical request other than success.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Attempt budget used up on retryable failures. A normal outcome.
    #[error("Retries exhausted after {attempts} attempts. Last error (status {last_status}): {last_error}")]
    RetriesExhausted { attempts: u32, last_status: u16, last_error: String },

    /// Upstream rejected the request in a way retrying cannot fix.
    #[error("Non-retryable upstream error (status {status}): {body}")]
    NonRetryable { status: u16, body: String },

    /// Cancellation was signalled before the request finished.
    #[error("Request cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },

    /// No credential could be leased.
    #[error("No credential available: {0}")]
    NoCredential(#[from] PoolError),
}

/// Successful result of a logical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution<T> {
    pub value: T,
    pub attempts: u32,
    pub credential_id: String,
}

/// Sender half of a cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Receiver half; cheap to clone into every task of the request.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Pending forever if the handle was dropped
    /// without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

/// Six lowercase alphanumerics, used to prefix per-request log lines.
pub fn generate_trace_id() -> String {
    rand::Rng::sample_iter(rand::thread_rng(), &rand::distributions::Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

/// Drives attempts through the classifier and decision engine.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: Arc<RetryPolicy>,
    classifier: Arc<Classifier>,
}

impl RetryExecutor {
    /// `policy` must already have passed [`RetryPolicy::check`].
    pub fn new(policy: RetryPolicy, classifier: &ClassifierConfig) -> Self {
        Self { policy: Arc::new(policy), classifier: Arc::new(Classifier::new(classifier)) }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Run one logical request.
    ///
    /// `attempt_fn` receives the leased credential and the 1-based attempt
    /// index. The credential is kept across retries unless the decision says
    /// to rotate; rotated-away credentials are skipped until every credential
    /// has been tried or the rest are all busy, after which the exclusion set
    /// starts over.
    pub async fn run<T, F, Fut>(
        &self,
        trace_id: &str,
        pool: &CredentialPool,
        cancel: &CancelSignal,
        mut attempt_fn: F,
    ) -> Result<Execution<T>, ExecutionError>
    where
        F: FnMut(Arc<Credential>, u32) -> Fut,
        Fut: Future<Output = AttemptResult<T>>,
    {
        let max_attempts = self.policy.max_attempts;
        let mut cancel = cancel.clone();
        let mut excluded: HashSet<String> = HashSet::new();
        let mut held = None;
        let mut attempt = NonZeroU32::MIN;

        loop {
            if cancel.is_cancelled() {
                info!("[{}] Request cancelled before attempt {}", trace_id, attempt);
                return Err(ExecutionError::Cancelled { attempts: attempt.get() - 1 });
            }

            let lease = match held.take() {
                Some(lease) => lease,
                None => {
                    if !excluded.is_empty() && pool.is_fully_excluded(&excluded) {
                        debug!(
                            "[{}] All {} credentials attempted, resetting exclusions",
                            trace_id,
                            pool.len()
                        );
                        excluded.clear();
                    }
                    match pool.checkout(&excluded) {
                        Ok(lease) => lease,
                        // Everything not excluded is at its in-flight limit; fall back to
                        // the credentials this request rotated away from.
                        Err(PoolError::AllBusy { .. }) if !excluded.is_empty() => {
                            debug!(
                                "[{}] Remaining credentials busy, resetting {} exclusions",
                                trace_id,
                                excluded.len()
                            );
                            excluded.clear();
                            pool.checkout(&excluded)?
                        },
                        Err(e) => return Err(e.into()),
                    }
                },
            };

            debug!(
                "[{}] Attempt {}/{} using credential {}",
                trace_id,
                attempt,
                max_attempts,
                lease.id()
            );

            let failure = match attempt_fn(Arc::clone(lease.credential()), attempt.get()).await {
                Ok(value) => {
                    pool.mark_success(lease.id());
                    if attempt.get() > 1 {
                        info!(
                            "[{}] Succeeded on attempt {}/{} with credential {}",
                            trace_id,
                            attempt,
                            max_attempts,
                            lease.id()
                        );
                    }
                    return Ok(Execution {
                        value,
                        attempts: attempt.get(),
                        credential_id: lease.id().to_string(),
                    });
                },
                Err(failure) => failure,
            };

            let (status, classification, error_text) = match failure {
                AttemptFailure::Http { status, body } => {
                    let classification = self.classifier.classify(status, body.as_deref());
                    (status, classification, body.unwrap_or_else(|| format!("HTTP {}", status)))
                },
                AttemptFailure::Transport { message, timed_out } => {
                    warn!(
                        "[{}] Transport failure on attempt {} (timed_out={}): {}",
                        trace_id, attempt, timed_out, message
                    );
                    (TRANSPORT_STATUS, classify_transport(), message)
                },
            };

            let outcome = AttemptOutcome::new(classification, status, attempt);
            let decision = decide(&outcome, &self.policy);
            log_decision(trace_id, &outcome, &decision, max_attempts);

            if classification == Classification::OtherRetryable {
                pool.mark_failure(lease.id());
            }

            if !decision.should_retry {
                return Err(match classification {
                    Classification::NonRetryable | Classification::Success => {
                        ExecutionError::NonRetryable { status, body: error_text }
                    },
                    _ => ExecutionError::RetriesExhausted {
                        attempts: attempt.get(),
                        last_status: status,
                        last_error: error_text,
                    },
                });
            }

            if decision.rotate_credential {
                excluded.insert(lease.id().to_string());
                drop(lease);
            } else {
                held = Some(lease);
            }

            tokio::select! {
                () = tokio::time::sleep(decision.delay()) => {}
                () = cancel.cancelled() => {
                    info!("[{}] Request cancelled during backoff after attempt {}", trace_id, attempt);
                    return Err(ExecutionError::Cancelled { attempts: attempt.get() });
                }
            }

            attempt = match attempt.checked_add(1) {
                Some(next) => next,
                None => {
                    return Err(ExecutionError::RetriesExhausted {
                        attempts: attempt.get(),
                        last_status: status,
                        last_error: error_text,
                    })
                },
            };
        }
    }
}
