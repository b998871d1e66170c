//! Audit records and the requests that create them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use verdant_core::{Amount, AuditId, DataHash, LogicalTime, Principal};

/// Waste category of an audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Compostable and biodegradable waste.
    Organic,
    /// Waste routed to material recovery.
    Recyclable,
    /// Waste requiring controlled handling.
    Hazardous,
}

impl Category {
    /// Every accepted category.
    pub const ALL: [Self; 3] = [Self::Organic, Self::Recyclable, Self::Hazardous];

    /// Wire name of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Organic => "organic",
            Self::Recyclable => "recyclable",
            Self::Hazardous => "hazardous",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("category", s))
    }
}

/// Measurement unit for tonnage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Kilograms.
    Kg,
    /// Metric tons.
    Ton,
    /// Pounds.
    Lb,
}

impl Unit {
    /// Every accepted unit.
    pub const ALL: [Self; 3] = [Self::Kg, Self::Ton, Self::Lb];

    /// Wire name of the unit.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kg => "kg",
            Self::Ton => "ton",
            Self::Lb => "lb",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|u| u.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("unit", s))
    }
}

/// A string that names no member of a closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    /// Which enumeration was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// An admitted audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Sequential id, assigned at admission.
    pub id: AuditId,
    /// Who submitted the audit. Never changes.
    pub submitter: Principal,
    /// Content hash, unique across the registry.
    pub data_hash: DataHash,
    /// Quantity of waste, always positive.
    pub tonnage: u64,
    /// Free-text waste description.
    pub waste_type: String,
    /// Reduction percentage in `0..=100`.
    pub reduction_metric: u8,
    /// Logical time of the last write.
    pub timestamp: LogicalTime,
    /// Reporting period, always positive.
    pub period: u64,
    /// Waste category.
    pub category: Category,
    /// Where the waste was audited.
    pub location: String,
    /// Unit of `tonnage`.
    pub unit: Unit,
    /// Origin of the audited data.
    pub source: String,
    /// Verification level in `0..=5`.
    pub verification_level: u8,
    /// Compliance score in `0..=100`.
    pub compliance_score: u8,
    /// Set on creation; no operation clears it.
    pub status: bool,
}

/// The most recent amendment of an audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditUpdateRecord {
    /// Tonnage written by the update.
    pub tonnage: u64,
    /// Reduction metric written by the update.
    pub reduction_metric: u8,
    /// When the update happened.
    pub timestamp: LogicalTime,
    /// Who made the update.
    pub updater: Principal,
}

/// Proof of the fee paid for one admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeReceipt {
    /// The audit the fee paid for.
    pub audit_id: AuditId,
    /// Fee in effect at admission.
    pub amount: Amount,
    /// The submitter.
    pub from: Principal,
    /// The registry principal at admission.
    pub to: Principal,
    /// Admission time.
    pub at: LogicalTime,
}

/// A submission as received from a caller, before validation.
///
/// Fields stay in their raw form so the admission rules can reject each one
/// with its own error in a fixed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitAudit {
    /// Content hash; must be 32 bytes.
    pub data_hash: Vec<u8>,
    /// Must be positive.
    pub tonnage: u64,
    /// 1 to 50 characters.
    pub waste_type: String,
    /// At most 100.
    pub reduction_metric: u64,
    /// Must be positive.
    pub period: u64,
    /// One of `organic`, `recyclable`, `hazardous`.
    pub category: String,
    /// 1 to 100 characters.
    pub location: String,
    /// One of `kg`, `ton`, `lb`.
    pub unit: String,
    /// 1 to 100 characters.
    pub source: String,
    /// At most 5.
    pub verification_level: u64,
    /// At most 100.
    pub compliance_score: u64,
}
