//! Verdant Registry - admission control and durable state for environmental
//! audit records.
//!
//! This crate provides:
//! - Field, authorization, uniqueness and readiness checks for submissions
//! - Sequential audit ids with a content-hash uniqueness index
//! - Fee collection through a pluggable [`ValueTransfer`]
//! - Owner-only amendments with a latest-update history
//! - Durable state on any `verdant_storage::KvStore`
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use verdant_core::Principal;
//! use verdant_registry::{AuditRegistry, ManualClock, StaticOracle, SubmitAudit};
//!
//! let submitter = Principal::new("ST1TEST").unwrap();
//! let registry = AuditRegistry::builder()
//!     .oracle(Arc::new(StaticOracle::new([submitter.clone()])))
//!     .clock(Arc::new(ManualClock::starting_at(1)))
//!     .open()
//!     .unwrap();
//! registry
//!     .set_registry_principal(Principal::new("ST2TEST").unwrap())
//!     .unwrap();
//!
//! let id = registry
//!     .submit_audit(&submitter, SubmitAudit {
//!         data_hash: vec![0xab; 32],
//!         tonnage: 100,
//!         waste_type: "plastic".into(),
//!         reduction_metric: 20,
//!         period: 30,
//!         category: "recyclable".into(),
//!         location: "City Center".into(),
//!         unit: "kg".into(),
//!         source: "Factory A".into(),
//!         verification_level: 3,
//!         compliance_score: 85,
//!     })
//!     .unwrap();
//!
//! assert_eq!(registry.get_audit_count(), 1);
//! assert!(registry.check_audit_existence([0xab; 32]));
//! assert_eq!(registry.fee_receipt(id).unwrap().amount, 500);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod admission;
mod clock;
mod config;
mod error;
mod oracle;
mod record;
mod registry;
mod storage;
mod transfer;

pub use admission::{
    MAX_LOCATION_LEN, MAX_PERCENT, MAX_SOURCE_LEN, MAX_VERIFICATION_LEVEL, MAX_WASTE_TYPE_LEN,
    ValidatedFields, validate_fields,
};
pub use clock::{LogicalClock, ManualClock, WallClock};
pub use config::{DEFAULT_MAX_AUDITS, DEFAULT_SUBMISSION_FEE, RegistryConfig};
pub use error::{InvalidField, RegistryError, RegistryResult};
pub use oracle::{AuthorizationOracle, StaticOracle};
pub use record::{
    AuditRecord, AuditUpdateRecord, Category, FeeReceipt, SubmitAudit, Unit, UnknownVariant,
};
pub use registry::{AuditRegistry, RegistryBuilder};
pub use storage::{KvRegistryStorage, Mutation, RegistrySnapshot, RegistryStorage};
pub use transfer::{InMemoryLedger, TransferError, TransferRecord, ValueTransfer};

// Re-export shared value types for convenience
pub use verdant_core::{Amount, AuditId, DataHash, LogicalTime, Principal};
