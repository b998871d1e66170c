//! Test fixtures for common types.

use verdant_core::{DataHash, HASH_LEN, Principal};
use verdant_registry::SubmitAudit;

/// Build a principal from a literal known to be valid.
///
/// # Panics
///
/// Panics if `value` is not a valid principal.
#[must_use]
pub fn test_principal(value: &str) -> Principal {
    Principal::new(value).expect("invalid test principal")
}

/// The verified submitter used throughout the tests.
#[must_use]
pub fn test_submitter() -> Principal {
    test_principal("ST1TEST")
}

/// The principal that receives fees.
#[must_use]
pub fn test_registry_principal() -> Principal {
    test_principal("ST2TEST")
}

/// A principal the oracle does not know.
#[must_use]
pub fn test_outsider() -> Principal {
    test_principal("ST3OUTSIDER")
}

/// A hash with every byte set to `fill`.
#[must_use]
pub fn test_hash(fill: u8) -> DataHash {
    DataHash::from_bytes([fill; HASH_LEN])
}

/// A valid submission whose data hash is `test_hash(fill)`.
#[must_use]
pub fn test_submission(fill: u8) -> SubmitAudit {
    SubmitAudit {
        data_hash: test_hash(fill).as_bytes().to_vec(),
        tonnage: 100,
        waste_type: "plastic".to_string(),
        reduction_metric: 20,
        period: 30,
        category: "recyclable".to_string(),
        location: "City Center".to_string(),
        unit: "kg".to_string(),
        source: "Factory A".to_string(),
        verification_level: 3,
        compliance_score: 85,
    }
}

/// A valid submission adjusted by `edit`.
#[must_use]
pub fn test_submission_with(fill: u8, edit: impl FnOnce(&mut SubmitAudit)) -> SubmitAudit {
    let mut submission = test_submission(fill);
    edit(&mut submission);
    submission
}
