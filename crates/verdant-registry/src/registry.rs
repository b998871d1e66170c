//! The audit registry.
//!
//! All state lives behind one [`RwLock`]. Mutations hold the write guard for
//! the whole check-then-act sequence:
//!
//! ```text
//! validate -> transfer fee -> durable batch -> apply in memory
//! ```
//!
//! Queries take the read guard and return copies.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, error, info, warn};
use verdant_core::{Amount, AuditId, DataHash, Principal};

use crate::admission::{self, AdmissionView};
use crate::clock::{LogicalClock, WallClock};
use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::oracle::{AuthorizationOracle, StaticOracle};
use crate::record::{AuditRecord, AuditUpdateRecord, FeeReceipt, SubmitAudit};
use crate::storage::{KvRegistryStorage, Mutation, RegistrySnapshot, RegistryStorage};
use crate::transfer::{InMemoryLedger, ValueTransfer};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Records in id order plus the hash index.
#[derive(Debug, Default)]
struct RegistryState {
    config: RegistryConfig,
    next_audit_id: AuditId,
    records: Vec<AuditRecord>,
    by_hash: HashMap<DataHash, AuditId>,
    updates: HashMap<AuditId, AuditUpdateRecord>,
    receipts: HashMap<AuditId, FeeReceipt>,
}

impl RegistryState {
    /// Rebuild state from storage, rejecting anything that breaks the
    /// id-density, index or capacity invariants.
    fn from_snapshot(
        mut config: RegistryConfig,
        snapshot: RegistrySnapshot,
    ) -> RegistryResult<Self> {
        let RegistrySnapshot {
            next_audit_id,
            registry_principal,
            submission_fee,
            mut records,
            hash_index,
            updates,
            receipts,
        } = snapshot;

        if next_audit_id.get() > config.max_audits {
            return Err(RegistryError::InvalidConfigValue(format!(
                "stored registry holds {next_audit_id} audits, above max_audits {}",
                config.max_audits
            )));
        }

        records.sort_by_key(|r| r.id);
        let dense = records
            .iter()
            .zip(0u64..)
            .all(|(record, expected)| record.id.get() == expected);
        let count = u64::try_from(records.len()).unwrap_or(u64::MAX);
        if !dense || count != next_audit_id.get() {
            return Err(corrupt(format!(
                "{count} records do not form ids 0..{next_audit_id}"
            )));
        }

        let mut by_hash = HashMap::with_capacity(records.len());
        for record in &records {
            if by_hash.insert(record.data_hash, record.id).is_some() {
                return Err(corrupt(format!("duplicate data hash {}", record.data_hash)));
            }
        }
        let index_matches = hash_index.len() == by_hash.len()
            && hash_index
                .iter()
                .all(|(hash, id)| by_hash.get(hash) == Some(id));
        if !index_matches {
            return Err(corrupt("hash index disagrees with records".to_owned()));
        }

        let known = |id: &AuditId| id.get() < next_audit_id.get();
        if !updates.keys().all(known) || !receipts.keys().all(known) {
            return Err(corrupt("history refers to unknown audit".to_owned()));
        }

        if let Some(principal) = registry_principal {
            config.registry_principal = Some(principal);
        }
        if let Some(fee) = submission_fee {
            config.submission_fee = fee;
        }

        Ok(Self {
            config,
            next_audit_id,
            records,
            by_hash,
            updates,
            receipts,
        })
    }

    fn record(&self, id: AuditId) -> Option<&AuditRecord> {
        usize::try_from(id.get())
            .ok()
            .and_then(|idx| self.records.get(idx))
    }

    fn record_mut(&mut self, id: AuditId) -> Option<&mut AuditRecord> {
        usize::try_from(id.get())
            .ok()
            .and_then(|idx| self.records.get_mut(idx))
    }
}

impl AdmissionView for RegistryState {
    fn admitted_count(&self) -> u64 {
        self.next_audit_id.get()
    }

    fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn is_indexed(&self, hash: &DataHash) -> bool {
        self.by_hash.contains_key(hash)
    }
}

fn corrupt(detail: String) -> RegistryError {
    RegistryError::Storage(format!("corrupt registry state: {detail}"))
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`AuditRegistry`].
pub struct RegistryBuilder {
    config: RegistryConfig,
    storage: Option<Arc<dyn RegistryStorage>>,
    oracle: Option<Arc<dyn AuthorizationOracle>>,
    transfer: Option<Arc<dyn ValueTransfer>>,
    clock: Option<Arc<dyn LogicalClock>>,
}

impl RegistryBuilder {
    fn new() -> Self {
        Self {
            config: RegistryConfig::default(),
            storage: None,
            oracle: None,
            transfer: None,
            clock: None,
        }
    }

    /// Capacity ceiling.
    #[must_use]
    pub fn max_audits(mut self, max_audits: u64) -> Self {
        self.config.max_audits = max_audits;
        self
    }

    /// Initial submission fee. A fee stored by an earlier
    /// [`AuditRegistry::set_submission_fee`] takes precedence.
    #[must_use]
    pub fn submission_fee(mut self, fee: Amount) -> Self {
        self.config.submission_fee = fee;
        self
    }

    /// Persistence backend. Defaults to in-memory storage.
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn RegistryStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Authorization oracle. Defaults to one that verifies nobody.
    #[must_use]
    pub fn oracle(mut self, oracle: Arc<dyn AuthorizationOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Fee transfer mechanism. Defaults to an unmetered in-memory ledger.
    #[must_use]
    pub fn transfer(mut self, transfer: Arc<dyn ValueTransfer>) -> Self {
        self.transfer = Some(transfer);
        self
    }

    /// Logical clock. Defaults to [`WallClock`].
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn LogicalClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Load persisted state and build the registry.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read, holds inconsistent state,
    /// or already holds more audits than `max_audits`.
    pub fn open(self) -> RegistryResult<AuditRegistry> {
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(KvRegistryStorage::in_memory()));
        let snapshot = storage.load()?;
        let state = RegistryState::from_snapshot(self.config, snapshot)?;

        info!(
            audits = state.next_audit_id.get(),
            max_audits = state.config.max_audits,
            submission_fee = state.config.submission_fee,
            principal_set = state.config.registry_principal.is_some(),
            "Audit registry opened"
        );

        Ok(AuditRegistry {
            state: RwLock::new(state),
            storage,
            oracle: self
                .oracle
                .unwrap_or_else(|| Arc::new(StaticOracle::default())),
            transfer: self
                .transfer
                .unwrap_or_else(|| Arc::new(InMemoryLedger::unmetered())),
            clock: self.clock.unwrap_or_else(|| Arc::new(WallClock::new())),
        })
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Registry of environmental audits.
///
/// Owns every record, the hash index and the configuration. Callers only
/// ever receive copies.
pub struct AuditRegistry {
    state: RwLock<RegistryState>,
    storage: Arc<dyn RegistryStorage>,
    oracle: Arc<dyn AuthorizationOracle>,
    transfer: Arc<dyn ValueTransfer>,
    clock: Arc<dyn LogicalClock>,
}

impl std::fmt::Debug for AuditRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRegistry")
            .field("audits", &self.get_audit_count())
            .finish_non_exhaustive()
    }
}

impl AuditRegistry {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    fn read_state(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RegistryResult<RwLockWriteGuard<'_, RegistryState>> {
        self.state
            .write()
            .map_err(|e| RegistryError::Internal(format!("registry lock poisoned: {e}")))
    }

    /// Admit a new audit and charge the submission fee.
    ///
    /// # Errors
    ///
    /// Returns the first failing admission rule, a transfer failure, or a
    /// storage failure. On any error no id is consumed and no record exists.
    pub fn submit_audit(
        &self,
        caller: &Principal,
        request: SubmitAudit,
    ) -> RegistryResult<AuditId> {
        let mut state = self.write_state()?;

        let admitted = admission::admit(&*state, self.oracle.as_ref(), caller, request)
            .inspect_err(|e| {
                debug!(caller = %caller, code = e.code(), error = %e, "Submission rejected");
            })?;

        let id = state.next_audit_id;
        let next_audit_id = id.next().ok_or(RegistryError::CapacityExceeded)?;
        let fee = state.config.submission_fee;
        let registry_principal = admitted.registry_principal;

        self.transfer
            .transfer(fee, caller, &registry_principal)
            .map_err(|e| {
                debug!(caller = %caller, fee, error = %e, "Fee transfer failed");
                RegistryError::TransferFailed(e)
            })?;

        let now = self.clock.now();
        let record = admitted.fields.into_record(id, caller.clone(), now);
        let receipt = FeeReceipt {
            audit_id: id,
            amount: fee,
            from: caller.clone(),
            to: registry_principal,
            at: now,
        };

        if let Err(e) = self.storage.commit(Mutation::Admit {
            record: &record,
            receipt: &receipt,
            next_audit_id,
        }) {
            error!(
                amount = receipt.amount,
                from = %receipt.from,
                to = %receipt.to,
                error = %e,
                "Fee transferred but audit was not persisted"
            );
            return Err(e);
        }

        info!(
            audit_id = %id,
            submitter = %caller,
            data_hash = %record.data_hash,
            fee,
            "Audit admitted"
        );

        state.by_hash.insert(record.data_hash, id);
        state.records.push(record);
        state.receipts.insert(id, receipt);
        state.next_audit_id = next_audit_id;
        Ok(id)
    }

    /// Amend tonnage and reduction metric of the caller's own audit.
    ///
    /// # Errors
    ///
    /// `NotFound`, `NotAuthorized` for anyone but the submitter,
    /// `InvalidUpdateParam` for zero tonnage or a metric above 100, or a
    /// storage failure. The record is unchanged on error.
    pub fn update_audit(
        &self,
        caller: &Principal,
        id: AuditId,
        tonnage: u64,
        reduction_metric: u64,
    ) -> RegistryResult<()> {
        let mut state = self.write_state()?;

        let current = state.record(id).ok_or(RegistryError::NotFound { id })?;
        let checked = if current.submitter != *caller {
            Err(RegistryError::NotAuthorized)
        } else if tonnage == 0 {
            Err(RegistryError::InvalidUpdateParam)
        } else {
            admission::update_metric(reduction_metric).ok_or(RegistryError::InvalidUpdateParam)
        };
        let reduction_metric = checked.inspect_err(|e| {
            debug!(audit_id = %id, caller = %caller, code = e.code(), error = %e, "Update rejected");
        })?;

        let now = self.clock.now();
        let mut updated = current.clone();
        updated.tonnage = tonnage;
        updated.reduction_metric = reduction_metric;
        updated.timestamp = now;
        let history = AuditUpdateRecord {
            tonnage,
            reduction_metric,
            timestamp: now,
            updater: caller.clone(),
        };

        self.storage.commit(Mutation::Update {
            record: &updated,
            update: &history,
        })?;

        info!(audit_id = %id, tonnage, reduction_metric, "Audit updated");

        if let Some(slot) = state.record_mut(id) {
            *slot = updated;
        }
        state.updates.insert(id, history);
        Ok(())
    }

    /// Snapshot of one audit.
    #[must_use]
    pub fn get_audit(&self, id: AuditId) -> Option<AuditRecord> {
        self.read_state().record(id).cloned()
    }

    /// Number of admitted audits.
    #[must_use]
    pub fn get_audit_count(&self) -> u64 {
        self.read_state().next_audit_id.get()
    }

    /// Whether an audit with this content hash exists.
    ///
    /// Input of the wrong length is never registered, so it yields `false`.
    #[must_use]
    pub fn check_audit_existence(&self, data_hash: impl AsRef<[u8]>) -> bool {
        self.find_by_hash(data_hash).is_some()
    }

    /// Id of the audit with this content hash, if any.
    #[must_use]
    pub fn find_by_hash(&self, data_hash: impl AsRef<[u8]>) -> Option<AuditId> {
        let hash = DataHash::try_from_slice(data_hash.as_ref())?;
        self.read_state().by_hash.get(&hash).copied()
    }

    /// The latest update of an audit, if it was ever updated.
    #[must_use]
    pub fn get_audit_update(&self, id: AuditId) -> Option<AuditUpdateRecord> {
        self.read_state().updates.get(&id).cloned()
    }

    /// The fee receipt stored when the audit was admitted.
    #[must_use]
    pub fn fee_receipt(&self, id: AuditId) -> Option<FeeReceipt> {
        self.read_state().receipts.get(&id).cloned()
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> RegistryConfig {
        self.read_state().config.clone()
    }

    /// Latch the principal that receives submission fees.
    ///
    /// # Errors
    ///
    /// `InvalidConfigValue` for the burn address, `ConfigAlreadySet` if a
    /// principal is already latched, or a storage failure.
    pub fn set_registry_principal(&self, principal: Principal) -> RegistryResult<()> {
        let mut state = self.write_state()?;

        state.config.check_principal(&principal).inspect_err(|e| {
            warn!(principal = %principal, error = %e, "Registry principal rejected");
        })?;
        self.storage.commit(Mutation::SetPrincipal(&principal))?;

        info!(principal = %principal, "Registry principal set");
        state.config.registry_principal = Some(principal);
        Ok(())
    }

    /// Replace the submission fee. Later admissions charge the new fee;
    /// existing receipts are untouched.
    ///
    /// # Errors
    ///
    /// `RegistryNotVerified` until a registry principal is set, or a storage
    /// failure.
    pub fn set_submission_fee(&self, fee: Amount) -> RegistryResult<()> {
        let mut state = self.write_state()?;

        state.config.require_principal().inspect_err(|e| {
            warn!(fee, error = %e, "Submission fee rejected");
        })?;
        self.storage.commit(Mutation::SetFee(fee))?;

        info!(
            old_fee = state.config.submission_fee,
            new_fee = fee,
            "Submission fee changed"
        );
        state.config.submission_fee = fee;
        Ok(())
    }

    /// Flush storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to flush.
    pub fn close(&self) -> RegistryResult<()> {
        self.storage.close()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
