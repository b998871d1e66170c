//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Principal strings longer than this are rejected.
const MAX_PRINCIPAL_LEN: usize = 150;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_registry(config)?;
    validate_oracle(config)?;
    validate_storage(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_principal(field: &str, value: &str) -> ConfigResult<()> {
    if value.is_empty() {
        return Err(invalid(field, "principal must not be empty"));
    }
    if value.chars().count() > MAX_PRINCIPAL_LEN {
        return Err(invalid(
            field,
            format!("principal is longer than {MAX_PRINCIPAL_LEN} characters"),
        ));
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid(
            field,
            format!("principal '{value}' contains whitespace or control characters"),
        ));
    }
    Ok(())
}

fn validate_registry(config: &Config) -> ConfigResult<()> {
    let r = &config.registry;

    if r.max_audits == 0 {
        return Err(invalid("registry.max_audits", "max_audits must be at least 1"));
    }

    if let Some(principal) = &r.registry_principal {
        validate_principal("registry.registry_principal", principal)?;
    }

    Ok(())
}

fn validate_oracle(config: &Config) -> ConfigResult<()> {
    for principal in &config.oracle.verified {
        validate_principal("oracle.verified", principal)?;
    }
    Ok(())
}

fn validate_storage(config: &Config) -> ConfigResult<()> {
    let s = &config.storage;

    if !matches!(s.backend.as_str(), "memory" | "surrealkv") {
        return Err(invalid(
            "storage.backend",
            format!(
                "unsupported backend '{}'; expected one of: memory, surrealkv",
                s.backend
            ),
        ));
    }

    if s.path.as_deref().is_some_and(str::is_empty) {
        return Err(invalid("storage.path", "path must not be empty"));
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !matches!(
        l.level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(invalid(
            "logging.level",
            format!(
                "invalid level '{}'; expected one of: trace, debug, info, warn, error",
                l.level
            ),
        ));
    }

    if !matches!(
        l.format.to_ascii_lowercase().as_str(),
        "pretty" | "compact" | "json" | "full"
    ) {
        return Err(invalid(
            "logging.format",
            format!(
                "invalid format '{}'; expected one of: pretty, compact, json, full",
                l.format
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: ConfigResult<()>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = Config::default();
        config.registry.max_audits = 0;
        assert_eq!(field_of(validate(&config)), "registry.max_audits");
    }

    #[test]
    fn test_principal_rules() {
        let mut config = Config::default();
        config.registry.registry_principal = Some(String::new());
        assert_eq!(field_of(validate(&config)), "registry.registry_principal");

        config.registry.registry_principal = Some("ST2 TEST".to_owned());
        assert_eq!(field_of(validate(&config)), "registry.registry_principal");

        config.registry.registry_principal = Some("ST2TEST".to_owned());
        assert!(validate(&config).is_ok());

        config.oracle.verified = vec!["ST1TEST".to_owned(), "\tbad".to_owned()];
        assert_eq!(field_of(validate(&config)), "oracle.verified");
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let mut config = Config::default();
        config.storage.backend = "postgres".to_owned();
        assert_eq!(field_of(validate(&config)), "storage.backend");

        config.storage.backend = "memory".to_owned();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_logging_rules() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.level");

        config.logging.level = "DEBUG".to_owned();
        config.logging.format = "xml".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.format");
    }
}
