//! Authorization oracle: who may submit audits.

use std::collections::HashSet;
use std::sync::RwLock;

use tracing::warn;
use verdant_core::Principal;

/// Answers whether a principal is a verified registry.
///
/// Implementations must not have side effects and must report `false` when
/// they cannot decide.
pub trait AuthorizationOracle: Send + Sync {
    /// Whether `principal` may submit audits.
    fn is_verified(&self, principal: &Principal) -> bool;
}

/// Oracle backed by a fixed, editable set of principals.
#[derive(Debug, Default)]
pub struct StaticOracle {
    verified: RwLock<HashSet<Principal>>,
}

impl StaticOracle {
    /// Create an oracle that verifies exactly `principals`.
    #[must_use]
    pub fn new(principals: impl IntoIterator<Item = Principal>) -> Self {
        Self {
            verified: RwLock::new(principals.into_iter().collect()),
        }
    }

    /// Mark a principal as verified.
    pub fn verify(&self, principal: Principal) {
        match self.verified.write() {
            Ok(mut set) => {
                set.insert(principal);
            },
            Err(e) => warn!(error = %e, "oracle lock poisoned, verify ignored"),
        }
    }

    /// Withdraw verification.
    pub fn revoke(&self, principal: &Principal) {
        match self.verified.write() {
            Ok(mut set) => {
                set.remove(principal);
            },
            Err(e) => warn!(error = %e, "oracle lock poisoned, revoke ignored"),
        }
    }

    /// Number of verified principals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.verified.read().map_or(0, |set| set.len())
    }

    /// Whether no principal is verified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuthorizationOracle for StaticOracle {
    fn is_verified(&self, principal: &Principal) -> bool {
        self.verified
            .read()
            .is_ok_and(|set| set.contains(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Principal {
        Principal::new(s).unwrap()
    }

    #[test]
    fn test_static_oracle_membership() {
        let oracle = StaticOracle::new([p("ST1TEST")]);
        assert!(oracle.is_verified(&p("ST1TEST")));
        assert!(!oracle.is_verified(&p("ST2TEST")));
        assert_eq!(oracle.len(), 1);
    }

    #[test]
    fn test_verify_and_revoke() {
        let oracle = StaticOracle::default();
        assert!(oracle.is_empty());
        oracle.verify(p("ST1TEST"));
        assert!(oracle.is_verified(&p("ST1TEST")));
        oracle.revoke(&p("ST1TEST"));
        assert!(!oracle.is_verified(&p("ST1TEST")));
    }
}
