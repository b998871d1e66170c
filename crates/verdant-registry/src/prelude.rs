//! Prelude module - commonly used types for convenient import.
//!
//! Use `use verdant_registry::prelude::*;` to import all essential types.

// Errors
pub use crate::{InvalidField, RegistryError, RegistryResult};

// Records
pub use crate::{AuditRecord, AuditUpdateRecord, Category, FeeReceipt, SubmitAudit, Unit};

// Registry and configuration
pub use crate::{AuditRegistry, RegistryBuilder, RegistryConfig};

// Collaborators
pub use crate::{
    AuthorizationOracle, InMemoryLedger, LogicalClock, ManualClock, StaticOracle, TransferError,
    ValueTransfer, WallClock,
};

// Storage
pub use crate::{KvRegistryStorage, RegistryStorage};

// Value types
pub use crate::{Amount, AuditId, DataHash, LogicalTime, Principal};
