//! Raw key-value store trait and implementations.
//!
//! All operations are scoped to a namespace. The registry uses
//! `registry:*` namespaces for its tables and indexes.
//!
//! - **In-memory** (always available): for tests and ephemeral registries
//! - **`SurrealKV`** (behind `kv` feature): persistent, ACID-compliant

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate that a namespace is safe for use as a key prefix.
///
/// Namespaces must be non-empty and must not contain the null byte
/// (used internally as the namespace/key separator).
fn validate_namespace(namespace: &str) -> StorageResult<()> {
    if namespace.is_empty() {
        return Err(StorageError::InvalidKey(
            "namespace must not be empty".into(),
        ));
    }
    if namespace.contains('\0') {
        return Err(StorageError::InvalidKey(
            "namespace must not contain null bytes".into(),
        ));
    }
    Ok(())
}

/// Validate that a key is safe for storage.
fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".into()));
    }
    if key.contains('\0') {
        return Err(StorageError::InvalidKey(
            "key must not contain null bytes".into(),
        ));
    }
    Ok(())
}

/// Build the composite key `"{namespace}\0{key}"` as bytes.
#[cfg(feature = "kv")]
fn composite_key(namespace: &str, key: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(namespace.len().saturating_add(key.len()).saturating_add(1));
    buf.extend_from_slice(namespace.as_bytes());
    buf.push(0);
    buf.extend_from_slice(key.as_bytes());
    buf
}

/// Inclusive start of a namespace range: `"{namespace}\0"`.
#[cfg(feature = "kv")]
fn namespace_range_start(namespace: &str) -> Vec<u8> {
    let mut buf = namespace.as_bytes().to_vec();
    buf.push(0);
    buf
}

/// Exclusive end of a namespace range: `"{namespace}\x01"`.
#[cfg(feature = "kv")]
fn namespace_range_end(namespace: &str) -> Vec<u8> {
    let mut buf = namespace.as_bytes().to_vec();
    buf.push(1);
    buf
}

// ---------------------------------------------------------------------------
// Batch operations
// ---------------------------------------------------------------------------

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvOp {
    /// Insert or overwrite a value.
    Set {
        /// Target namespace.
        namespace: String,
        /// Key within the namespace.
        key: String,
        /// Raw value bytes.
        value: Vec<u8>,
    },
    /// Remove a key (no-op if absent).
    Delete {
        /// Target namespace.
        namespace: String,
        /// Key within the namespace.
        key: String,
    },
}

impl KvOp {
    /// Build a `Set` operation.
    #[must_use]
    pub fn set(namespace: impl Into<String>, key: impl Into<String>, value: Vec<u8>) -> Self {
        Self::Set {
            namespace: namespace.into(),
            key: key.into(),
            value,
        }
    }

    /// Build a `Delete` operation.
    #[must_use]
    pub fn delete(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Delete {
            namespace: namespace.into(),
            key: key.into(),
        }
    }

    fn validate(&self) -> StorageResult<()> {
        let (namespace, key) = match self {
            Self::Set { namespace, key, .. } | Self::Delete { namespace, key } => (namespace, key),
        };
        validate_namespace(namespace)?;
        validate_key(key)
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Raw key-value store trait.
///
/// Provides namespaced byte-level storage. Implementations must apply a
/// [`write_batch`](Self::write_batch) atomically: either every operation is
/// visible afterwards or none is.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get a value by namespace and key.
    ///
    /// Returns `None` if the key does not exist.
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Set a value for a namespace and key, overwriting any existing value.
    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Delete a key from a namespace.
    ///
    /// Returns `true` if the key existed and was deleted.
    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool>;

    /// List all keys in a namespace.
    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>>;

    /// Apply a set of writes atomically.
    async fn write_batch(&self, ops: Vec<KvOp>) -> StorageResult<()>;

    /// Flush pending writes and release the backend.
    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation (always available)
// ---------------------------------------------------------------------------

/// In-memory key-value store for tests and ephemeral registries.
///
/// Keys are stored as `"{namespace}\0{key}"` in a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    data: std::sync::RwLock<std::collections::HashMap<String, Vec<u8>>>,
}

impl MemoryKvStore {
    /// Create a new empty in-memory KV store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn full_key(namespace: &str, key: &str) -> String {
        format!("{namespace}\0{key}")
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(data.get(&Self::full_key(namespace, key)).cloned())
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        data.insert(Self::full_key(namespace, key), value);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(data.remove(&Self::full_key(namespace, key)).is_some())
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        validate_namespace(namespace)?;
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let prefix = format!("{namespace}\0");
        Ok(data
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix).map(String::from))
            .collect())
    }

    async fn write_batch(&self, ops: Vec<KvOp>) -> StorageResult<()> {
        // Validate everything before touching the map so a bad op leaves no trace.
        for op in &ops {
            op.validate()?;
        }
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let count = ops.len();
        for op in ops {
            match op {
                KvOp::Set {
                    namespace,
                    key,
                    value,
                } => {
                    data.insert(Self::full_key(&namespace, &key), value);
                },
                KvOp::Delete { namespace, key } => {
                    data.remove(&Self::full_key(&namespace, &key));
                },
            }
        }
        tracing::trace!(ops = count, "applied in-memory batch");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SurrealKV implementation (behind `kv` feature)
// ---------------------------------------------------------------------------

/// Persistent key-value store backed by `SurrealKV`.
///
/// ACID-compliant, embedded LSM-tree storage. Every write, including each
/// batch, runs in its own transaction.
///
/// # Example
///
/// ```rust,ignore
/// use verdant_storage::SurrealKvStore;
///
/// let store = SurrealKvStore::open("./data/registry")?;
/// store.set("registry:meta", "next_audit_id", b"0".to_vec()).await?;
/// ```
#[cfg(feature = "kv")]
pub struct SurrealKvStore {
    tree: surrealkv::Tree,
}

#[cfg(feature = "kv")]
impl std::fmt::Debug for SurrealKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurrealKvStore").finish_non_exhaustive()
    }
}

#[cfg(feature = "kv")]
impl SurrealKvStore {
    /// Open a persistent KV store at the given directory path.
    ///
    /// Creates the directory if it does not exist. `SurrealKV` spawns its
    /// background tasks here, so this must run inside a tokio runtime that
    /// stays alive for as long as the store is used.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the store cannot be opened.
    pub fn open(path: impl AsRef<std::path::Path>) -> StorageResult<Self> {
        let tree = surrealkv::TreeBuilder::new()
            .with_path(path.as_ref().to_path_buf())
            .build()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self { tree })
    }
}

#[cfg(feature = "kv")]
fn map_kv_err(e: &surrealkv::Error) -> StorageError {
    StorageError::Internal(e.to_string())
}

#[cfg(feature = "kv")]
#[async_trait]
impl KvStore for SurrealKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let ck = composite_key(namespace, key);
        let tx = self
            .tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(|ref e| map_kv_err(e))?;
        tx.get(&ck).map_err(|ref e| map_kv_err(e))
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.write_batch(vec![KvOp::set(namespace, key, value)])
            .await
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let ck = composite_key(namespace, key);
        let mut tx = self.tree.begin().map_err(|ref e| map_kv_err(e))?;
        let existed = tx.get(&ck).map_err(|ref e| map_kv_err(e))?.is_some();
        if existed {
            tx.delete(&ck).map_err(|ref e| map_kv_err(e))?;
            tx.commit().await.map_err(|ref e| map_kv_err(e))?;
        }
        Ok(existed)
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        validate_namespace(namespace)?;
        let start = namespace_range_start(namespace);
        let end = namespace_range_end(namespace);
        let prefix_len = start.len();

        let tx = self
            .tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(|ref e| map_kv_err(e))?;
        let mut iter = tx.range(&start, &end).map_err(|ref e| map_kv_err(e))?;
        iter.seek_first().map_err(|ref e| map_kv_err(e))?;

        let mut keys = Vec::new();
        while iter.valid() {
            let raw_key = iter.key();
            if let Some(suffix) = raw_key.get(prefix_len..)
                && !suffix.is_empty()
                && let Ok(key_str) = std::str::from_utf8(suffix)
            {
                keys.push(key_str.to_string());
            }
            iter.next().map_err(|ref e| map_kv_err(e))?;
        }
        Ok(keys)
    }

    async fn write_batch(&self, ops: Vec<KvOp>) -> StorageResult<()> {
        for op in &ops {
            op.validate()?;
        }
        if ops.is_empty() {
            return Ok(());
        }

        let mut tx = self.tree.begin().map_err(|ref e| map_kv_err(e))?;
        for op in &ops {
            match op {
                KvOp::Set {
                    namespace,
                    key,
                    value,
                } => {
                    let ck = composite_key(namespace, key);
                    tx.set(&ck, value).map_err(|ref e| map_kv_err(e))?;
                },
                KvOp::Delete { namespace, key } => {
                    let ck = composite_key(namespace, key);
                    tx.delete(&ck).map_err(|ref e| map_kv_err(e))?;
                },
            }
        }
        tx.commit().await.map_err(|ref e| map_kv_err(e))?;
        tracing::trace!(ops = ops.len(), "committed surrealkv batch");
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        self.tree
            .close()
            .await
            .map_err(|ref e| map_kv_err(e))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_get_set() {
        let store = MemoryKvStore::new();
        store.set("ns1", "key1", b"hello".to_vec()).await.unwrap();
        let val = store.get("ns1", "key1").await.unwrap();
        assert_eq!(val, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn test_memory_get_missing() {
        let store = MemoryKvStore::new();
        assert!(store.get("ns1", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_delete() {
        let store = MemoryKvStore::new();
        store.set("ns1", "k", b"v".to_vec()).await.unwrap();
        assert!(store.delete("ns1", "k").await.unwrap());
        assert!(!store.delete("ns1", "k").await.unwrap());
        assert!(store.get("ns1", "k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_namespace_isolation() {
        let store = MemoryKvStore::new();
        store.set("ns1", "k", b"v1".to_vec()).await.unwrap();
        store.set("ns2", "k", b"v2".to_vec()).await.unwrap();
        assert_eq!(store.get("ns1", "k").await.unwrap(), Some(b"v1".to_vec()));
        assert_eq!(store.get("ns2", "k").await.unwrap(), Some(b"v2".to_vec()));

        let mut keys = store.list_keys("ns1").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["k"]);
    }

    #[tokio::test]
    async fn test_memory_batch_applies_all() {
        let store = MemoryKvStore::new();
        store.set("meta", "stale", b"x".to_vec()).await.unwrap();

        store
            .write_batch(vec![
                KvOp::set("records", "0", b"r0".to_vec()),
                KvOp::set("index", "abcd", b"0".to_vec()),
                KvOp::delete("meta", "stale"),
            ])
            .await
            .unwrap();

        assert_eq!(
            store.get("records", "0").await.unwrap(),
            Some(b"r0".to_vec())
        );
        assert_eq!(
            store.get("index", "abcd").await.unwrap(),
            Some(b"0".to_vec())
        );
        assert!(store.get("meta", "stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_batch_rejects_invalid_op_without_partial_write() {
        let store = MemoryKvStore::new();
        let result = store
            .write_batch(vec![
                KvOp::set("records", "0", b"r0".to_vec()),
                KvOp::set("records", "", b"bad".to_vec()),
            ])
            .await;

        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
        assert!(store.list_keys("records").await.unwrap().is_empty());
    }

    #[test]
    fn test_validate_namespace_rejects_empty() {
        assert!(validate_namespace("").is_err());
        assert!(validate_namespace("ns\0bad").is_err());
    }

    #[test]
    fn test_validate_key_rejects_null_byte() {
        assert!(validate_key("").is_err());
        assert!(validate_key("k\0bad").is_err());
    }

    #[cfg(feature = "kv")]
    mod surreal_kv_tests {
        use super::*;

        fn make_store() -> (SurrealKvStore, tempfile::TempDir) {
            let dir = tempfile::tempdir().unwrap();
            let store = SurrealKvStore::open(dir.path()).unwrap();
            (store, dir)
        }

        #[tokio::test]
        async fn test_surreal_get_set() {
            let (store, _dir) = make_store();
            store.set("ns1", "key1", b"hello".to_vec()).await.unwrap();
            let val = store.get("ns1", "key1").await.unwrap();
            assert_eq!(val, Some(b"hello".to_vec()));
        }

        #[tokio::test]
        async fn test_surreal_batch_and_list() {
            let (store, _dir) = make_store();
            store
                .write_batch(vec![
                    KvOp::set("ns1", "a", b"1".to_vec()),
                    KvOp::set("ns1", "b", b"2".to_vec()),
                    KvOp::set("ns2", "c", b"3".to_vec()),
                ])
                .await
                .unwrap();
            let mut keys = store.list_keys("ns1").await.unwrap();
            keys.sort();
            assert_eq!(keys, vec!["a", "b"]);
        }

        #[tokio::test]
        async fn test_surreal_delete() {
            let (store, _dir) = make_store();
            store.set("ns1", "k", b"v".to_vec()).await.unwrap();
            assert!(store.delete("ns1", "k").await.unwrap());
            assert!(!store.delete("ns1", "k").await.unwrap());
        }
    }
}
