//! Registry configuration held by the store.

use serde::{Deserialize, Serialize};
use verdant_core::{Amount, Principal};

use crate::error::{RegistryError, RegistryResult};

/// Default fee charged per admitted audit.
pub const DEFAULT_SUBMISSION_FEE: Amount = 500;

/// Default capacity ceiling.
pub const DEFAULT_MAX_AUDITS: u64 = 10_000;

/// Fee, capacity and the one-time registry principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Principal receiving fees. Latched once, never changed.
    pub registry_principal: Option<Principal>,
    /// Fee charged per admission.
    pub submission_fee: Amount,
    /// Maximum number of audits the registry will admit.
    pub max_audits: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_principal: None,
            submission_fee: DEFAULT_SUBMISSION_FEE,
            max_audits: DEFAULT_MAX_AUDITS,
        }
    }
}

impl RegistryConfig {
    /// Check whether `principal` may be latched, without changing anything.
    pub(crate) fn check_principal(&self, principal: &Principal) -> RegistryResult<()> {
        if principal.is_burn() {
            return Err(RegistryError::InvalidConfigValue(
                "registry principal cannot be the burn address".to_owned(),
            ));
        }
        if self.registry_principal.is_some() {
            return Err(RegistryError::ConfigAlreadySet);
        }
        Ok(())
    }

    /// The registry principal, or `RegistryNotVerified` when unset.
    pub(crate) fn require_principal(&self) -> RegistryResult<&Principal> {
        self.registry_principal
            .as_ref()
            .ok_or(RegistryError::RegistryNotVerified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.submission_fee, 500);
        assert_eq!(config.max_audits, 10_000);
        assert!(config.registry_principal.is_none());
    }

    #[test]
    fn test_check_principal_rejects_burn_before_latch_state() {
        let mut config = RegistryConfig::default();
        assert!(matches!(
            config.check_principal(&Principal::burn()),
            Err(RegistryError::InvalidConfigValue(_))
        ));

        config.registry_principal = Some(Principal::new("ST2TEST").unwrap());
        assert!(matches!(
            config.check_principal(&Principal::burn()),
            Err(RegistryError::InvalidConfigValue(_))
        ));
        assert_eq!(
            config.check_principal(&Principal::new("ST3TEST").unwrap()),
            Err(RegistryError::ConfigAlreadySet)
        );
    }

    #[test]
    fn test_require_principal() {
        let mut config = RegistryConfig::default();
        assert_eq!(
            config.require_principal(),
            Err(RegistryError::RegistryNotVerified)
        );
        let p = Principal::new("ST2TEST").unwrap();
        config.registry_principal = Some(p.clone());
        assert_eq!(config.require_principal(), Ok(&p));
    }
}
