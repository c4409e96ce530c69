//! RAII lease for cancellation-safe in-flight counting.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use super::Credential;

/// A checked-out credential. Decrements the credential's in-flight counter
/// on drop, including when the owning future is cancelled mid-attempt.
pub struct CredentialLease {
    in_flight: Arc<DashMap<String, AtomicU32>>,
    credential: Arc<Credential>,
}

impl CredentialLease {
    /// Atomically reserve a slot if the current count is below `max_in_flight`.
    /// Returns `None` when the limit would be exceeded.
    pub(crate) fn try_new(
        in_flight: Arc<DashMap<String, AtomicU32>>,
        credential: Arc<Credential>,
        max_in_flight: u32,
    ) -> Option<Self> {
        let key = credential.id().to_string();
        in_flight.entry(key.clone()).or_insert_with(|| AtomicU32::new(0));

        let counter_ref = in_flight.get(&key)?;
        loop {
            let current = counter_ref.load(Ordering::SeqCst);
            if current >= max_in_flight {
                return None;
            }
            if counter_ref
                .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                drop(counter_ref);
                return Some(Self { in_flight, credential });
            }
        }
    }

    pub fn credential(&self) -> &Arc<Credential> {
        &self.credential
    }

    pub fn id(&self) -> &str {
        self.credential.id()
    }
}

impl std::fmt::Debug for CredentialLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialLease").field("id", &self.credential.id()).finish()
    }
}

impl Drop for CredentialLease {
    fn drop(&mut self) {
        if let Some(counter) = self.in_flight.get(self.credential.id()) {
            let _ = counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                if v > 0 {
                    Some(v - 1)
                } else {
                    None
                }
            });
        }
    }
}
