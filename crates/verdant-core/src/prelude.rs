//! Prelude module - commonly used types for convenient import.
//!
//! Use `use verdant_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{PrincipalError, PrincipalResult};

// Identity and hashing
pub use crate::{DataHash, Principal};

// Counters
pub use crate::{Amount, AuditId, LogicalTime};
