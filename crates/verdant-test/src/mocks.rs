//! Mock collaborators for testing.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use verdant_core::{Amount, Principal};
use verdant_registry::{AuthorizationOracle, TransferError, TransferRecord, ValueTransfer};

pub use verdant_registry::ManualClock;

/// Mock authorization oracle that records every query.
///
/// Clones share state, so a test can keep a handle after passing one to the
/// registry.
#[derive(Debug, Clone, Default)]
pub struct MockOracle {
    verified: Arc<Mutex<HashSet<Principal>>>,
    queries: Arc<Mutex<Vec<Principal>>>,
    verify_everyone: bool,
}

impl MockOracle {
    /// Create an oracle that verifies nobody.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an oracle that verifies every principal.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            verify_everyone: true,
            ..Self::default()
        }
    }

    /// Add a verified principal.
    #[must_use]
    pub fn with_verified(self, principal: Principal) -> Self {
        self.verify(principal);
        self
    }

    /// Add a verified principal after construction.
    pub fn verify(&self, principal: Principal) {
        if let Ok(mut guard) = self.verified.lock() {
            guard.insert(principal);
        }
    }

    /// Withdraw verification.
    pub fn revoke(&self, principal: &Principal) {
        if let Ok(mut guard) = self.verified.lock() {
            guard.remove(principal);
        }
    }

    /// Principals the registry asked about, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<Principal> {
        self.queries.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl AuthorizationOracle for MockOracle {
    fn is_verified(&self, principal: &Principal) -> bool {
        if let Ok(mut guard) = self.queries.lock() {
            guard.push(principal.clone());
        }
        self.verify_everyone
            || self
                .verified
                .lock()
                .is_ok_and(|guard| guard.contains(principal))
    }
}

/// Mock transfer that journals every transfer and can fail on demand.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransfer {
    journal: Arc<Mutex<Vec<TransferRecord>>>,
    failures: Arc<Mutex<VecDeque<TransferError>>>,
}

impl RecordingTransfer {
    /// Create a transfer that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a failure for an upcoming transfer.
    #[must_use]
    pub fn with_failure(self, error: TransferError) -> Self {
        self.fail_next(error);
        self
    }

    /// Queue a failure for the next transfer.
    pub fn fail_next(&self, error: TransferError) {
        if let Ok(mut guard) = self.failures.lock() {
            guard.push_back(error);
        }
    }

    /// Completed transfers, oldest first.
    #[must_use]
    pub fn transfers(&self) -> Vec<TransferRecord> {
        self.journal.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Sum of all completed transfers.
    #[must_use]
    pub fn total(&self) -> Amount {
        self.transfers()
            .iter()
            .fold(0, |sum, t| sum.saturating_add(t.amount))
    }
}

impl ValueTransfer for RecordingTransfer {
    fn transfer(
        &self,
        amount: Amount,
        from: &Principal,
        to: &Principal,
    ) -> Result<(), TransferError> {
        let queued = self.failures.lock().ok().and_then(|mut g| g.pop_front());
        if let Some(error) = queued {
            return Err(error);
        }
        if let Ok(mut guard) = self.journal.lock() {
            guard.push(TransferRecord {
                amount,
                from: from.clone(),
                to: to.clone(),
            });
        }
        Ok(())
    }
}

/// Mock transfer that rejects everything.
#[derive(Debug, Clone)]
pub struct FailingTransfer {
    error: TransferError,
}

impl FailingTransfer {
    /// Reject every transfer with `error`.
    #[must_use]
    pub fn new(error: TransferError) -> Self {
        Self { error }
    }
}

impl Default for FailingTransfer {
    fn default() -> Self {
        Self::new(TransferError::Rejected("transfers disabled".to_string()))
    }
}

impl ValueTransfer for FailingTransfer {
    fn transfer(&self, _: Amount, _: &Principal, _: &Principal) -> Result<(), TransferError> {
        Err(self.error.clone())
    }
}
