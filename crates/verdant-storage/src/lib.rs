//! Verdant Storage - namespaced key-value persistence.
//!
//! The [`KvStore`] trait provides byte-level `get`/`set`/`delete` plus an
//! atomic [`write_batch`](KvStore::write_batch) across namespaces. The
//! registry commits every mutation as a single batch so that a record, its
//! hash-index entry and the allocator counter land together or not at all.
//!
//! # Backends
//!
//! | Backend | Feature | Use |
//! |---------|---------|-----|
//! | [`MemoryKvStore`] | always | tests, ephemeral registries |
//! | `SurrealKvStore` | `kv` | durable registries (embedded LSM tree, ACID) |

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod kv;

pub use error::{StorageError, StorageResult};
pub use kv::{KvOp, KvStore, MemoryKvStore};

#[cfg(feature = "kv")]
pub use kv::SurrealKvStore;
