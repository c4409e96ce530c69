//! Credential pool: owns the accounts/keys the executor rotates between.
//!
//! Selection is least-in-flight first, then fewest consecutive failures, then
//! round-robin order from a shared cursor. Checkout holds the cursor lock for
//! the whole select-and-reserve step, so concurrent requests never pick from
//! a stale view of each other's reservations.

mod lease;

pub use lease::CredentialLease;

use dashmap::DashMap;
use parking_lot::Mutex;
use relaygate_types::{CredentialSpec, PoolConfig, PoolError};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// One account/key usable for upstream attempts.
pub struct Credential {
    id: String,
    secret: String,
}

impl Credential {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self { id: id.into(), secret: secret.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential").field("id", &self.id).field("secret", &"<redacted>").finish()
    }
}

impl From<&CredentialSpec> for Credential {
    fn from(spec: &CredentialSpec) -> Self {
        Self::new(spec.id.clone(), spec.secret.clone())
    }
}

#[derive(Default)]
struct HealthCounters {
    consecutive_failures: AtomicU32,
    total_successes: AtomicU64,
    total_failures: AtomicU64,
}

/// Point-in-time counters for one credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialStats {
    pub id: String,
    pub in_flight: u32,
    pub consecutive_failures: u32,
    pub total_successes: u64,
    pub total_failures: u64,
}

pub struct CredentialPool {
    order: Vec<Arc<Credential>>,
    in_flight: Arc<DashMap<String, AtomicU32>>,
    health: DashMap<String, HealthCounters>,
    cursor: Mutex<usize>,
    max_in_flight: u32,
}

impl CredentialPool {
    /// `max_in_flight_per_credential == 0` means unlimited.
    pub fn new(
        credentials: Vec<Credential>,
        max_in_flight_per_credential: u32,
    ) -> Result<Self, PoolError> {
        let mut seen = HashSet::new();
        for c in &credentials {
            if !seen.insert(c.id.clone()) {
                return Err(PoolError::Duplicate { id: c.id.clone() });
            }
        }

        let health = DashMap::new();
        for c in &credentials {
            health.insert(c.id.clone(), HealthCounters::default());
        }

        let max_in_flight = if max_in_flight_per_credential == 0 {
            u32::MAX
        } else {
            max_in_flight_per_credential
        };

        Ok(Self {
            order: credentials.into_iter().map(Arc::new).collect(),
            in_flight: Arc::new(DashMap::new()),
            health,
            cursor: Mutex::new(0),
            max_in_flight,
        })
    }

    pub fn from_config(config: &PoolConfig) -> Result<Self, PoolError> {
        let credentials = config.credentials.iter().map(Credential::from).collect();
        Self::new(credentials, config.max_in_flight_per_credential)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// True when every credential in the pool appears in `exclude`.
    pub fn is_fully_excluded(&self, exclude: &HashSet<String>) -> bool {
        self.order.iter().all(|c| exclude.contains(c.id()))
    }

    /// Lease the best available credential not listed in `exclude`.
    pub fn checkout(&self, exclude: &HashSet<String>) -> Result<CredentialLease, PoolError> {
        let total = self.order.len();
        if total == 0 {
            return Err(PoolError::Empty);
        }

        let mut cursor = self.cursor.lock();
        let start = *cursor % total;

        let mut candidates: Vec<(usize, &Arc<Credential>)> = (0..total)
            .map(|offset| (start + offset) % total)
            .map(|idx| (idx, &self.order[idx]))
            .filter(|(_, c)| !exclude.contains(c.id()))
            .collect();

        // Stable sort: ties keep round-robin order from the cursor.
        candidates.sort_by_key(|(_, c)| (self.in_flight_of(c.id()), self.failures_of(c.id())));

        for (idx, credential) in candidates {
            if let Some(lease) = CredentialLease::try_new(
                Arc::clone(&self.in_flight),
                Arc::clone(credential),
                self.max_in_flight,
            ) {
                *cursor = (idx + 1) % total;
                tracing::debug!(
                    "Checked out credential {} (in_flight={})",
                    credential.id(),
                    self.in_flight_of(credential.id())
                );
                return Ok(lease);
            }
        }

        Err(PoolError::AllBusy { total })
    }

    pub fn mark_success(&self, id: &str) {
        if let Some(h) = self.health.get(id) {
            h.consecutive_failures.store(0, Ordering::SeqCst);
            h.total_successes.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Returns the new consecutive-failure count (0 for unknown ids).
    pub fn mark_failure(&self, id: &str) -> u32 {
        match self.health.get(id) {
            Some(h) => {
                h.total_failures.fetch_add(1, Ordering::Relaxed);
                h.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1
            },
            None => 0,
        }
    }

    pub fn stats(&self) -> Vec<CredentialStats> {
        self.order
            .iter()
            .map(|c| {
                let (consecutive_failures, total_successes, total_failures) = self
                    .health
                    .get(c.id())
                    .map(|h| {
                        (
                            h.consecutive_failures.load(Ordering::SeqCst),
                            h.total_successes.load(Ordering::Relaxed),
                            h.total_failures.load(Ordering::Relaxed),
                        )
                    })
                    .unwrap_or_default();
                CredentialStats {
                    id: c.id().to_string(),
                    in_flight: self.in_flight_of(c.id()),
                    consecutive_failures,
                    total_successes,
                    total_failures,
                }
            })
            .collect()
    }

    pub fn in_flight_of(&self, id: &str) -> u32 {
        self.in_flight.get(id).map(|c| c.load(Ordering::SeqCst)).unwrap_or(0)
    }

    fn failures_of(&self, id: &str) -> u32 {
        self.health.get(id).map(|h| h.consecutive_failures.load(Ordering::SeqCst)).unwrap_or(0)
    }
}
