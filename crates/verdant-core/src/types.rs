//! Identity and counter types shared across the registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PrincipalError, PrincipalResult};

/// Fee amounts, in the smallest unit of the transfer mechanism.
pub type Amount = u64;

/// Maximum accepted length of a principal string.
const MAX_PRINCIPAL_LEN: usize = 150;

/// Identity of a party interacting with the registry.
///
/// A principal is an opaque, non-empty string without whitespace. The
/// registry never interprets it beyond equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    /// The burn address. It can never hold the registry principal role.
    pub const BURN: &'static str = "SP000000000000000000002Q6VF78";

    /// Parse a principal.
    ///
    /// # Errors
    ///
    /// Returns a [`PrincipalError`] if the string is empty, too long, or
    /// contains whitespace/control characters.
    pub fn new(value: impl Into<String>) -> PrincipalResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(PrincipalError::Empty);
        }
        let len = value.chars().count();
        if len > MAX_PRINCIPAL_LEN {
            return Err(PrincipalError::TooLong {
                len,
                max: MAX_PRINCIPAL_LEN,
            });
        }
        if let Some(bad) = value
            .chars()
            .find(|c| c.is_whitespace() || c.is_control())
        {
            return Err(PrincipalError::InvalidCharacter(bad));
        }
        Ok(Self(value))
    }

    /// The burn principal.
    #[must_use]
    pub fn burn() -> Self {
        Self(Self::BURN.to_owned())
    }

    /// Whether this is the burn principal.
    #[must_use]
    pub fn is_burn(&self) -> bool {
        self.0 == Self::BURN
    }

    /// Borrow the principal as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Principal {
    type Err = PrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Principal {
    type Error = PrincipalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Principal> for String {
    fn from(principal: Principal) -> Self {
        principal.0
    }
}

impl AsRef<str> for Principal {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Sequential identifier of an admitted audit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AuditId(pub u64);

impl AuditId {
    /// The first id handed out by an empty registry.
    pub const FIRST: Self = Self(0);

    /// The raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The id following this one, or `None` on overflow.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for AuditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AuditId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for AuditId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Monotonic, non-decreasing logical time.
///
/// Supplied by the environment (block height, wall-clock seconds, a test
/// counter), never computed by the registry itself.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LogicalTime(pub u64);

impl LogicalTime {
    /// Time zero.
    pub const ZERO: Self = Self(0);

    /// The raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LogicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_parse() {
        let p = Principal::new("ST1TEST").unwrap();
        assert_eq!(p.as_str(), "ST1TEST");
        assert_eq!(p.to_string(), "ST1TEST");
        assert!(!p.is_burn());
    }

    #[test]
    fn test_principal_rejects_empty() {
        assert_eq!(Principal::new(""), Err(PrincipalError::Empty));
    }

    #[test]
    fn test_principal_rejects_whitespace() {
        assert_eq!(
            Principal::new("ST1 TEST"),
            Err(PrincipalError::InvalidCharacter(' '))
        );
    }

    #[test]
    fn test_principal_rejects_too_long() {
        let long = "S".repeat(151);
        assert!(matches!(
            Principal::new(long),
            Err(PrincipalError::TooLong { len: 151, .. })
        ));
    }

    #[test]
    fn test_burn_principal() {
        assert!(Principal::burn().is_burn());
        assert!(Principal::new(Principal::BURN).unwrap().is_burn());
    }

    #[test]
    fn test_principal_serde_validates() {
        let p: Principal = serde_json::from_str("\"ST2TEST\"").unwrap();
        assert_eq!(p.as_str(), "ST2TEST");
        assert!(serde_json::from_str::<Principal>("\"\"").is_err());
    }

    #[test]
    fn test_audit_id_next() {
        assert_eq!(AuditId::FIRST.next(), Some(AuditId(1)));
        assert_eq!(AuditId(u64::MAX).next(), None);
    }

    #[test]
    fn test_audit_id_parse() {
        assert_eq!("42".parse::<AuditId>().unwrap(), AuditId(42));
        assert!("-1".parse::<AuditId>().is_err());
    }

    #[test]
    fn test_logical_time_ordering() {
        assert!(LogicalTime(3) > LogicalTime(2));
        assert_eq!(LogicalTime::default(), LogicalTime::ZERO);
        assert_eq!(LogicalTime(7).to_string(), "t7");
    }
}
