//! Verdant Core - Foundation types for the Verdant audit registry.
//!
//! This crate provides:
//! - [`Principal`], the identity of submitters, updaters and fee recipients
//! - [`DataHash`], the 32-byte content hash that identifies an audit payload
//! - [`AuditId`] and [`LogicalTime`], the registry's counters
//!
//! It has no knowledge of admission rules or storage; those live in
//! `verdant-registry`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod error;
pub mod hash;
pub mod types;

pub use error::{PrincipalError, PrincipalResult};
pub use hash::{DataHash, HASH_LEN};
pub use types::{Amount, AuditId, LogicalTime, Principal};
