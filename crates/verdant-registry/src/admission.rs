//! Admission control for new submissions.
//!
//! Rules run in a fixed order and the first failure wins:
//!
//! 1. capacity
//! 2. to 12. field checks, in declaration order
//! 13. caller is verified by the oracle
//! 14. content hash is not yet registered
//! 15. registry principal is set

use verdant_core::{AuditId, DataHash, LogicalTime, Principal};

use crate::config::RegistryConfig;
use crate::error::{InvalidField, RegistryError, RegistryResult};
use crate::oracle::AuthorizationOracle;
use crate::record::{AuditRecord, Category, SubmitAudit, Unit};

/// Longest accepted `waste_type`, in characters.
pub const MAX_WASTE_TYPE_LEN: usize = 50;
/// Longest accepted `location`, in characters.
pub const MAX_LOCATION_LEN: usize = 100;
/// Longest accepted `source`, in characters.
pub const MAX_SOURCE_LEN: usize = 100;
/// Upper bound for percentage-like fields.
pub const MAX_PERCENT: u8 = 100;
/// Upper bound for `verification_level`.
pub const MAX_VERIFICATION_LEVEL: u8 = 5;

/// A submission whose fields passed rules 2 to 12.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFields {
    pub(crate) data_hash: DataHash,
    pub(crate) tonnage: u64,
    pub(crate) waste_type: String,
    pub(crate) reduction_metric: u8,
    pub(crate) period: u64,
    pub(crate) category: Category,
    pub(crate) location: String,
    pub(crate) unit: Unit,
    pub(crate) source: String,
    pub(crate) verification_level: u8,
    pub(crate) compliance_score: u8,
}

impl ValidatedFields {
    /// The parsed content hash.
    #[must_use]
    pub fn data_hash(&self) -> DataHash {
        self.data_hash
    }

    pub(crate) fn into_record(
        self,
        id: AuditId,
        submitter: Principal,
        timestamp: LogicalTime,
    ) -> AuditRecord {
        AuditRecord {
            id,
            submitter,
            data_hash: self.data_hash,
            tonnage: self.tonnage,
            waste_type: self.waste_type,
            reduction_metric: self.reduction_metric,
            timestamp,
            period: self.period,
            category: self.category,
            location: self.location,
            unit: self.unit,
            source: self.source,
            verification_level: self.verification_level,
            compliance_score: self.compliance_score,
            status: true,
        }
    }
}

/// Outcome of a full admission check.
#[derive(Debug)]
pub(crate) struct Admitted {
    pub(crate) fields: ValidatedFields,
    pub(crate) registry_principal: Principal,
}

/// Registry state the admission rules need to see.
pub(crate) trait AdmissionView {
    fn admitted_count(&self) -> u64;
    fn config(&self) -> &RegistryConfig;
    fn is_indexed(&self, hash: &DataHash) -> bool;
}

/// Check the field rules (2 to 12) of a submission.
///
/// Stateless, so callers can pre-check a request before sending it.
///
/// # Errors
///
/// Returns [`RegistryError::Validation`] naming the first invalid field.
pub fn validate_fields(request: SubmitAudit) -> RegistryResult<ValidatedFields> {
    let reject = RegistryError::invalid;

    let data_hash =
        DataHash::try_from_slice(&request.data_hash).ok_or(reject(InvalidField::Hash))?;
    let tonnage = positive(request.tonnage).ok_or(reject(InvalidField::Tonnage))?;
    let waste_type = bounded_text(request.waste_type, MAX_WASTE_TYPE_LEN)
        .ok_or(reject(InvalidField::WasteType))?;
    let reduction_metric = at_most(request.reduction_metric, MAX_PERCENT)
        .ok_or(reject(InvalidField::ReductionMetric))?;
    let period = positive(request.period).ok_or(reject(InvalidField::Period))?;
    let category = request
        .category
        .parse::<Category>()
        .map_err(|_| reject(InvalidField::Category))?;
    let location = bounded_text(request.location, MAX_LOCATION_LEN)
        .ok_or(reject(InvalidField::Location))?;
    let unit = request
        .unit
        .parse::<Unit>()
        .map_err(|_| reject(InvalidField::Unit))?;
    let source =
        bounded_text(request.source, MAX_SOURCE_LEN).ok_or(reject(InvalidField::Source))?;
    let verification_level = at_most(request.verification_level, MAX_VERIFICATION_LEVEL)
        .ok_or(reject(InvalidField::VerificationLevel))?;
    let compliance_score = at_most(request.compliance_score, MAX_PERCENT)
        .ok_or(reject(InvalidField::ComplianceScore))?;

    Ok(ValidatedFields {
        data_hash,
        tonnage,
        waste_type,
        reduction_metric,
        period,
        category,
        location,
        unit,
        source,
        verification_level,
        compliance_score,
    })
}

/// Run every admission rule against the current state.
pub(crate) fn admit(
    state: &impl AdmissionView,
    oracle: &dyn AuthorizationOracle,
    caller: &Principal,
    request: SubmitAudit,
) -> RegistryResult<Admitted> {
    if state.admitted_count() >= state.config().max_audits {
        return Err(RegistryError::CapacityExceeded);
    }

    let fields = validate_fields(request)?;

    if !oracle.is_verified(caller) {
        return Err(RegistryError::NotAuthorized);
    }
    if state.is_indexed(&fields.data_hash) {
        return Err(RegistryError::AuditAlreadyExists);
    }
    let registry_principal = state.config().require_principal()?.clone();

    Ok(Admitted {
        fields,
        registry_principal,
    })
}

/// Parse an update's metric with the same bound as admission.
pub(crate) fn update_metric(value: u64) -> Option<u8> {
    at_most(value, MAX_PERCENT)
}

fn positive(value: u64) -> Option<u64> {
    (value > 0).then_some(value)
}

fn at_most(value: u64, max: u8) -> Option<u8> {
    u8::try_from(value).ok().filter(|v| *v <= max)
}

fn bounded_text(value: String, max_chars: usize) -> Option<String> {
    (!value.is_empty() && value.chars().count() <= max_chars).then_some(value)
}
