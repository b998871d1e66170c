//! Registry error types.
//!
//! Every rejection is plain data: the variant (and, for validation failures,
//! the offending field) is enough to reproduce the exact reason. Stable
//! numeric codes are exposed through [`RegistryError::code`].

use std::fmt;

use thiserror::Error;
use verdant_core::AuditId;

use crate::transfer::TransferError;

/// Submission field that failed syntactic or semantic validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidField {
    /// `data_hash` was not exactly 32 bytes.
    Hash,
    /// `tonnage` was zero.
    Tonnage,
    /// `waste_type` was empty or longer than 50 characters.
    WasteType,
    /// `reduction_metric` exceeded 100.
    ReductionMetric,
    /// `period` was zero.
    Period,
    /// `category` was not one of organic, recyclable, hazardous.
    Category,
    /// `location` was empty or longer than 100 characters.
    Location,
    /// `unit` was not one of kg, ton, lb.
    Unit,
    /// `source` was empty or longer than 100 characters.
    Source,
    /// `verification_level` exceeded 5.
    VerificationLevel,
    /// `compliance_score` exceeded 100.
    ComplianceScore,
}

impl InvalidField {
    /// Stable error code for this field.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Hash => 102,
            Self::Tonnage => 103,
            Self::WasteType => 104,
            Self::ReductionMetric => 105,
            Self::Period => 110,
            Self::Category => 111,
            Self::Location => 116,
            Self::Unit => 117,
            Self::Source => 118,
            Self::VerificationLevel => 119,
            Self::ComplianceScore => 120,
        }
    }

    /// Snake-case field name as it appears in requests.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hash => "data_hash",
            Self::Tonnage => "tonnage",
            Self::WasteType => "waste_type",
            Self::ReductionMetric => "reduction_metric",
            Self::Period => "period",
            Self::Category => "category",
            Self::Location => "location",
            Self::Unit => "unit",
            Self::Source => "source",
            Self::VerificationLevel => "verification_level",
            Self::ComplianceScore => "compliance_score",
        }
    }
}

impl fmt::Display for InvalidField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors returned by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A submission field was malformed.
    #[error("invalid {field}")]
    Validation {
        /// The offending field.
        field: InvalidField,
    },

    /// The registry already holds `max_audits` records.
    #[error("audit capacity exceeded")]
    CapacityExceeded,

    /// A record with the same content hash already exists.
    #[error("audit with this data hash already exists")]
    AuditAlreadyExists,

    /// The caller is not allowed to perform the operation.
    #[error("caller is not authorized")]
    NotAuthorized,

    /// No registry principal has been configured yet.
    #[error("registry principal is not set")]
    RegistryNotVerified,

    /// No record exists with the given id.
    #[error("audit not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: AuditId,
    },

    /// An update carried a zero tonnage or an out-of-range metric.
    #[error("invalid update parameter")]
    InvalidUpdateParam,

    /// The registry principal has already been set.
    #[error("registry principal is already set")]
    ConfigAlreadySet,

    /// A configuration value was rejected.
    #[error("invalid configuration value: {0}")]
    InvalidConfigValue(String),

    /// The submission fee could not be transferred.
    #[error("fee transfer failed: {0}")]
    TransferFailed(TransferError),

    /// The durable store failed or holds inconsistent state.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization of persisted state failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The in-process state lock was poisoned by a panicking writer.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RegistryError {
    /// Shorthand for a validation failure on `field`.
    #[must_use]
    pub const fn invalid(field: InvalidField) -> Self {
        Self::Validation { field }
    }

    /// Stable numeric code for callers that match on codes.
    #[must_use]
    pub const fn code(&self) -> u32 {
        match self {
            Self::Validation { field } => field.code(),
            Self::NotAuthorized => 100,
            Self::AuditAlreadyExists => 106,
            Self::NotFound { .. } => 107,
            Self::RegistryNotVerified => 109,
            Self::InvalidUpdateParam => 113,
            Self::CapacityExceeded => 114,
            Self::ConfigAlreadySet => 121,
            Self::InvalidConfigValue(_) => 122,
            Self::TransferFailed(_) => 123,
            Self::Storage(_) => 130,
            Self::Serialization(_) => 131,
            Self::Internal(_) => 132,
        }
    }
}

impl From<verdant_storage::StorageError> for RegistryError {
    fn from(e: verdant_storage::StorageError) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
