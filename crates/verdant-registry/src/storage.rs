//! Durable registry state over a namespaced KV store.
//!
//! Every registry mutation becomes one [`KvOp`] batch, so a record, its
//! hash-index entry, its fee receipt and the allocator counter are written
//! together or not at all.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use verdant_core::{Amount, AuditId, DataHash, Principal};
use verdant_storage::{KvOp, KvStore, MemoryKvStore};

use crate::error::{RegistryError, RegistryResult};
use crate::record::{AuditRecord, AuditUpdateRecord, FeeReceipt};

/// Everything persisted by a registry, as loaded at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    /// Next id to hand out. Equals the number of admitted audits.
    pub next_audit_id: AuditId,
    /// Latched registry principal, if any.
    pub registry_principal: Option<Principal>,
    /// Fee set at runtime, if it was ever changed.
    pub submission_fee: Option<Amount>,
    /// Audit records, in any order.
    pub records: Vec<AuditRecord>,
    /// Hash index entries, in any order.
    pub hash_index: Vec<(DataHash, AuditId)>,
    /// Latest update per audit.
    pub updates: HashMap<AuditId, AuditUpdateRecord>,
    /// Fee receipt per audit.
    pub receipts: HashMap<AuditId, FeeReceipt>,
}

/// A single registry state change to persist.
#[derive(Debug, Clone, Copy)]
pub enum Mutation<'a> {
    /// A new audit was admitted.
    Admit {
        /// The new record.
        record: &'a AuditRecord,
        /// The fee receipt for it.
        receipt: &'a FeeReceipt,
        /// Allocator value after admission.
        next_audit_id: AuditId,
    },
    /// An audit was amended.
    Update {
        /// The record after the update.
        record: &'a AuditRecord,
        /// The update history entry.
        update: &'a AuditUpdateRecord,
    },
    /// The registry principal was latched.
    SetPrincipal(&'a Principal),
    /// The submission fee changed.
    SetFee(Amount),
}

/// Persistence backend for registry state.
///
/// `commit` must be all-or-nothing.
pub trait RegistryStorage: Send + Sync {
    /// Load the full persisted state.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or decoding fails.
    fn load(&self) -> RegistryResult<RegistrySnapshot>;

    /// Persist one mutation atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing was persisted.
    fn commit(&self, mutation: Mutation<'_>) -> RegistryResult<()>;

    /// Flush pending writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to flush.
    fn close(&self) -> RegistryResult<()>;
}

// -- Namespace constants --

const NS_AUDITS: &str = "registry:audits";
const NS_HASH_INDEX: &str = "registry:hash_index";
const NS_UPDATES: &str = "registry:updates";
const NS_FEES: &str = "registry:fees";
const NS_META: &str = "registry:meta";

const META_NEXT_ID: &str = "next_audit_id";
const META_PRINCIPAL: &str = "registry_principal";
const META_FEE: &str = "submission_fee";

/// Run an async future synchronously.
///
/// Inside a tokio runtime the future runs on a scoped thread; outside one a
/// temporary current-thread runtime drives it.
fn block_on<F>(f: F) -> RegistryResult<F::Output>
where
    F: std::future::Future + Send,
    F::Output: Send,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => block_on_handle(&handle, f),
        Err(_) => {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| RegistryError::Internal(format!("failed to create runtime: {e}")))?;
            Ok(rt.block_on(f))
        },
    }
}

/// Drive `f` on `handle`, hopping to a scoped thread when the caller is
/// itself inside an async context.
fn block_on_handle<F>(handle: &tokio::runtime::Handle, f: F) -> RegistryResult<F::Output>
where
    F: std::future::Future + Send,
    F::Output: Send,
{
    if tokio::runtime::Handle::try_current().is_ok() {
        std::thread::scope(|s| s.spawn(|| handle.block_on(f)).join())
            .map_err(|_| RegistryError::Internal("storage thread panicked".into()))
    } else {
        Ok(handle.block_on(f))
    }
}

/// Long-lived runtime owned by a durable store.
///
/// `SurrealKV` spawns background tasks when the tree is built, so the tree
/// has to be opened and driven on a runtime that outlives every call.
struct StorageRuntime(Option<tokio::runtime::Runtime>);

impl StorageRuntime {
    #[cfg_attr(not(feature = "kv"), allow(dead_code))]
    fn new() -> RegistryResult<Self> {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("verdant-storage")
            .enable_all()
            .build()
            .map_err(|e| RegistryError::Internal(format!("failed to create runtime: {e}")))?;
        Ok(Self(Some(rt)))
    }

    fn handle(&self) -> RegistryResult<&tokio::runtime::Handle> {
        self.0
            .as_ref()
            .map(tokio::runtime::Runtime::handle)
            .ok_or_else(|| RegistryError::Internal("storage runtime is gone".into()))
    }
}

impl Drop for StorageRuntime {
    fn drop(&mut self) {
        // Dropping a runtime blocks, which panics inside an async context.
        if let Some(rt) = self.0.take() {
            rt.shutdown_background();
        }
    }
}

/// Registry storage on top of any [`KvStore`].
pub struct KvRegistryStorage {
    // Declared before `runtime` so the store is dropped first.
    store: Arc<dyn KvStore>,
    runtime: Option<StorageRuntime>,
}

impl std::fmt::Debug for KvRegistryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvRegistryStorage")
            .field("owns_runtime", &self.runtime.is_some())
            .finish_non_exhaustive()
    }
}

impl KvRegistryStorage {
    /// Wrap an existing KV store.
    ///
    /// Calls are driven on the caller's runtime when there is one, otherwise
    /// on a temporary one. Stores with background tasks should come from
    /// [`KvRegistryStorage::open`] instead.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            runtime: None,
        }
    }

    /// Non-durable storage, for tests and ephemeral registries.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKvStore::new()))
    }

    /// Open or create durable storage at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the `SurrealKV` store fails to open.
    #[cfg(feature = "kv")]
    pub fn open(path: impl AsRef<std::path::Path>) -> RegistryResult<Self> {
        let runtime = StorageRuntime::new()?;
        let store = {
            let _guard = runtime.handle()?.enter();
            verdant_storage::SurrealKvStore::open(path)?
        };
        Ok(Self {
            store: Arc::new(store),
            runtime: Some(runtime),
        })
    }

    /// Run a store call to completion on the right runtime.
    fn run<F>(&self, f: F) -> RegistryResult<F::Output>
    where
        F: std::future::Future + Send,
        F::Output: Send,
    {
        match &self.runtime {
            Some(runtime) => block_on_handle(runtime.handle()?, f),
            None => block_on(f),
        }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        namespace: &str,
        key: &str,
    ) -> RegistryResult<Option<T>> {
        self.run(self.store.get(namespace, key))??
            .map(|bytes| serde_json::from_slice(&bytes).map_err(RegistryError::from))
            .transpose()
    }

    /// Load every value of a namespace with its parsed key.
    fn load_all<K, T>(&self, namespace: &str) -> RegistryResult<Vec<(K, T)>>
    where
        K: std::str::FromStr,
        T: DeserializeOwned,
    {
        let keys = self.run(self.store.list_keys(namespace))??;
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let parsed = key.parse::<K>().map_err(|_| {
                RegistryError::Storage(format!("malformed key {key:?} in {namespace}"))
            })?;
            let value = self.get_json(namespace, &key)?.ok_or_else(|| {
                RegistryError::Storage(format!("key {key:?} vanished from {namespace}"))
            })?;
            out.push((parsed, value));
        }
        Ok(out)
    }

    fn ops_for(mutation: Mutation<'_>) -> RegistryResult<Vec<KvOp>> {
        let ops = match mutation {
            Mutation::Admit {
                record,
                receipt,
                next_audit_id,
            } => {
                let id = record.id.to_string();
                vec![
                    KvOp::set(NS_AUDITS, id.clone(), to_json(record)?),
                    KvOp::set(NS_HASH_INDEX, record.data_hash.to_hex(), to_json(&record.id)?),
                    KvOp::set(NS_FEES, id, to_json(receipt)?),
                    KvOp::set(NS_META, META_NEXT_ID, to_json(&next_audit_id)?),
                ]
            },
            Mutation::Update { record, update } => {
                let id = record.id.to_string();
                vec![
                    KvOp::set(NS_AUDITS, id.clone(), to_json(record)?),
                    KvOp::set(NS_UPDATES, id, to_json(update)?),
                ]
            },
            Mutation::SetPrincipal(principal) => {
                vec![KvOp::set(NS_META, META_PRINCIPAL, to_json(principal)?)]
            },
            Mutation::SetFee(fee) => vec![KvOp::set(NS_META, META_FEE, to_json(&fee)?)],
        };
        Ok(ops)
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> RegistryResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

impl RegistryStorage for KvRegistryStorage {
    fn load(&self) -> RegistryResult<RegistrySnapshot> {
        let next_audit_id = self
            .get_json::<AuditId>(NS_META, META_NEXT_ID)?
            .unwrap_or(AuditId::FIRST);
        let registry_principal = self.get_json(NS_META, META_PRINCIPAL)?;
        let submission_fee = self.get_json(NS_META, META_FEE)?;

        let records = self
            .load_all::<AuditId, AuditRecord>(NS_AUDITS)?
            .into_iter()
            .map(|(_, record)| record)
            .collect();
        let hash_index = self.load_all::<DataHash, AuditId>(NS_HASH_INDEX)?;
        let updates = self
            .load_all::<AuditId, AuditUpdateRecord>(NS_UPDATES)?
            .into_iter()
            .collect();
        let receipts = self
            .load_all::<AuditId, FeeReceipt>(NS_FEES)?
            .into_iter()
            .collect();

        Ok(RegistrySnapshot {
            next_audit_id,
            registry_principal,
            submission_fee,
            records,
            hash_index,
            updates,
            receipts,
        })
    }

    fn commit(&self, mutation: Mutation<'_>) -> RegistryResult<()> {
        let ops = Self::ops_for(mutation)?;
        self.run(self.store.write_batch(ops))??;
        Ok(())
    }

    fn close(&self) -> RegistryResult<()> {
        self.run(self.store.close())??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use verdant_core::LogicalTime;

    use super::*;
    use crate::record::{Category, Unit};

    fn p(s: &str) -> Principal {
        Principal::new(s).unwrap()
    }

    fn record(id: u64, fill: u8) -> AuditRecord {
        AuditRecord {
            id: AuditId(id),
            submitter: p("ST1TEST"),
            data_hash: DataHash::from_bytes([fill; 32]),
            tonnage: 100,
            waste_type: "plastic".into(),
            reduction_metric: 20,
            timestamp: LogicalTime(1),
            period: 30,
            category: Category::Recyclable,
            location: "City Center".into(),
            unit: Unit::Kg,
            source: "Factory A".into(),
            verification_level: 3,
            compliance_score: 85,
            status: true,
        }
    }

    fn receipt(id: u64) -> FeeReceipt {
        FeeReceipt {
            audit_id: AuditId(id),
            amount: 500,
            from: p("ST1TEST"),
            to: p("ST2TEST"),
            at: LogicalTime(1),
        }
    }

    #[test]
    fn test_empty_load() {
        let storage = KvRegistryStorage::in_memory();
        let snapshot = storage.load().unwrap();
        assert_eq!(snapshot, RegistrySnapshot::default());
    }

    #[test]
    fn test_admit_persists_record_index_receipt_and_counter() {
        let storage = KvRegistryStorage::in_memory();
        let rec = record(0, 7);
        storage
            .commit(Mutation::Admit {
                record: &rec,
                receipt: &receipt(0),
                next_audit_id: AuditId(1),
            })
            .unwrap();

        let snapshot = storage.load().unwrap();
        assert_eq!(snapshot.next_audit_id, AuditId(1));
        assert_eq!(snapshot.records, vec![rec.clone()]);
        assert_eq!(snapshot.hash_index, vec![(rec.data_hash, AuditId(0))]);
        assert_eq!(snapshot.receipts.get(&AuditId(0)), Some(&receipt(0)));
        assert!(snapshot.updates.is_empty());
    }

    #[test]
    fn test_update_overwrites_record_and_history() {
        let storage = KvRegistryStorage::in_memory();
        let mut rec = record(0, 7);
        storage
            .commit(Mutation::Admit {
                record: &rec,
                receipt: &receipt(0),
                next_audit_id: AuditId(1),
            })
            .unwrap();

        rec.tonnage = 150;
        let update = AuditUpdateRecord {
            tonnage: 150,
            reduction_metric: 25,
            timestamp: LogicalTime(2),
            updater: p("ST1TEST"),
        };
        storage
            .commit(Mutation::Update {
                record: &rec,
                update: &update,
            })
            .unwrap();

        let snapshot = storage.load().unwrap();
        assert_eq!(snapshot.records[0].tonnage, 150);
        assert_eq!(snapshot.updates.get(&AuditId(0)), Some(&update));
    }

    #[test]
    fn test_config_mutations() {
        let storage = KvRegistryStorage::in_memory();
        storage
            .commit(Mutation::SetPrincipal(&p("ST2TEST")))
            .unwrap();
        storage.commit(Mutation::SetFee(750)).unwrap();

        let snapshot = storage.load().unwrap();
        assert_eq!(snapshot.registry_principal, Some(p("ST2TEST")));
        assert_eq!(snapshot.submission_fee, Some(750));
    }

    #[tokio::test]
    async fn test_block_on_inside_runtime() {
        let storage = KvRegistryStorage::in_memory();
        storage.commit(Mutation::SetFee(10)).unwrap();
        assert_eq!(storage.load().unwrap().submission_fee, Some(10));
    }

    #[test]
    fn test_malformed_key_is_storage_error() {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let storage = KvRegistryStorage::new(Arc::clone(&kv));
        block_on(kv.set(NS_AUDITS, "not-a-number", b"{}".to_vec()))
            .unwrap()
            .unwrap();

        assert!(matches!(storage.load(), Err(RegistryError::Storage(_))));
    }

    #[cfg(feature = "kv")]
    #[test]
    fn test_surreal_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry");
        let rec = record(0, 9);
        {
            let storage = KvRegistryStorage::open(&path).unwrap();
            storage
                .commit(Mutation::Admit {
                    record: &rec,
                    receipt: &receipt(0),
                    next_audit_id: AuditId(1),
                })
                .unwrap();
            storage.close().unwrap();
        }

        let storage = KvRegistryStorage::open(&path).unwrap();
        let snapshot = storage.load().unwrap();
        assert_eq!(snapshot.records, vec![rec]);
        assert_eq!(snapshot.next_audit_id, AuditId(1));
    }

    #[cfg(feature = "kv")]
    #[tokio::test]
    async fn test_surreal_usable_from_async_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry");
        {
            let storage = KvRegistryStorage::open(&path).unwrap();
            storage.commit(Mutation::SetFee(42)).unwrap();
            storage.close().unwrap();
            // Dropped inside the test runtime.
        }

        let storage = KvRegistryStorage::open(&path).unwrap();
        assert_eq!(storage.load().unwrap().submission_fee, Some(42));
        storage.close().unwrap();
    }
}
