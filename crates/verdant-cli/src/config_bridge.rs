//! Bridge from `verdant_config::Config` to registry and telemetry types.
//!
//! The config crate knows nothing about domain types; every conversion
//! from strings to principals, backends and log formats happens here.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};
use verdant_config::{Config, ResolvedConfig};
use verdant_registry::{
    AuditRegistry, InMemoryLedger, KvRegistryStorage, Principal, RegistryStorage, StaticOracle,
    WallClock,
};
use verdant_telemetry::LogConfig;

/// Prefix of rotated log files.
const LOG_FILE_PREFIX: &str = "verdant";

/// Directory under the data dir holding the `SurrealKV` tree.
const REGISTRY_DIR_NAME: &str = "registry";

/// Convert the `[logging]` section to a [`LogConfig`].
pub(crate) fn to_log_config(cfg: &Config) -> LogConfig {
    let format = cfg.logging.format.parse().unwrap_or_default();
    let mut log_config = LogConfig::new(&cfg.logging.level).with_format(format);

    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }

    if let Some(dir) = &cfg.logging.log_dir {
        log_config = log_config.with_file_logging(dir, LOG_FILE_PREFIX);
    }

    log_config
}

/// Build the static oracle from `[oracle].verified`.
pub(crate) fn to_oracle(cfg: &Config) -> Result<StaticOracle> {
    let principals = cfg
        .oracle
        .verified
        .iter()
        .map(|p| Principal::new(p.as_str()).with_context(|| format!("oracle.verified: '{p}'")))
        .collect::<Result<Vec<_>>>()?;
    Ok(StaticOracle::new(principals))
}

/// Open the storage backend named by `[storage]`.
pub(crate) fn to_storage(resolved: &ResolvedConfig) -> Result<Arc<dyn RegistryStorage>> {
    match resolved.config.storage.backend.as_str() {
        "memory" => {
            warn!("memory backend selected, registry state will not persist");
            Ok(Arc::new(KvRegistryStorage::in_memory()))
        },
        "surrealkv" => {
            let dir = resolved.data_dir();
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create data directory {}", dir.display()))?;
            let storage = KvRegistryStorage::open(dir.join(REGISTRY_DIR_NAME))?;
            Ok(Arc::new(storage))
        },
        other => bail!("unsupported storage backend '{other}'"),
    }
}

/// Open the registry described by the configuration.
///
/// A configured registry principal is latched on first open. Persisted
/// state wins over configuration for the fee and the principal.
pub(crate) fn open_registry(resolved: &ResolvedConfig) -> Result<AuditRegistry> {
    let cfg = &resolved.config;
    let registry = AuditRegistry::builder()
        .max_audits(cfg.registry.max_audits)
        .submission_fee(cfg.registry.submission_fee)
        .storage(to_storage(resolved)?)
        .oracle(Arc::new(to_oracle(cfg)?))
        .transfer(Arc::new(InMemoryLedger::unmetered()))
        .clock(Arc::new(WallClock::new()))
        .open()?;

    latch_principal(&registry, cfg)?;
    Ok(registry)
}

/// Latch `registry.registry_principal` if the registry has none yet.
fn latch_principal(registry: &AuditRegistry, cfg: &Config) -> Result<()> {
    let Some(configured) = &cfg.registry.registry_principal else {
        return Ok(());
    };
    let configured = Principal::new(configured.as_str())
        .with_context(|| format!("registry.registry_principal: '{configured}'"))?;

    match registry.config().registry_principal {
        None => {
            registry.set_registry_principal(configured.clone())?;
            info!(principal = %configured, "latched registry principal from configuration");
        },
        Some(current) if current != configured => {
            warn!(
                stored = %current,
                configured = %configured,
                "configured registry principal ignored, another one is already latched"
            );
        },
        Some(_) => {},
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use verdant_config::merge::FieldSources;
    use verdant_registry::AuthorizationOracle;
    use verdant_telemetry::{LogFormat, LogTarget};

    use super::*;

    fn resolved(config: Config, home: PathBuf) -> ResolvedConfig {
        ResolvedConfig {
            config,
            field_sources: FieldSources::new(),
            loaded_files: Vec::new(),
            home,
        }
    }

    fn memory_config() -> Config {
        let mut config = Config::default();
        "memory".clone_into(&mut config.storage.backend);
        config
    }

    #[test]
    fn test_to_log_config() {
        let mut config = Config::default();
        "debug".clone_into(&mut config.logging.level);
        "json".clone_into(&mut config.logging.format);
        config.logging.directives = vec!["verdant_registry=trace".to_owned()];
        config.logging.log_dir = Some("/var/log/verdant".to_owned());

        let log = to_log_config(&config);
        assert_eq!(log.level, "debug");
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.directives, vec!["verdant_registry=trace"]);
        assert_eq!(log.target, LogTarget::File(PathBuf::from("/var/log/verdant")));
    }

    #[test]
    fn test_to_oracle() {
        let mut config = Config::default();
        config.oracle.verified = vec!["ST1TEST".to_owned()];
        let oracle = to_oracle(&config).unwrap();
        assert!(oracle.is_verified(&Principal::new("ST1TEST").unwrap()));
        assert!(!oracle.is_verified(&Principal::new("ST3OTHER").unwrap()));
    }

    #[test]
    fn test_open_memory_registry_latches_principal() {
        let mut config = memory_config();
        config.registry.registry_principal = Some("ST2TEST".to_owned());
        config.registry.submission_fee = 42;

        let registry = open_registry(&resolved(config, PathBuf::from("/nonexistent"))).unwrap();
        let snapshot = registry.config();
        assert_eq!(
            snapshot.registry_principal,
            Some(Principal::new("ST2TEST").unwrap())
        );
        assert_eq!(snapshot.submission_fee, 42);
    }

    #[test]
    fn test_burn_principal_in_config_is_rejected() {
        let mut config = memory_config();
        config.registry.registry_principal = Some(Principal::BURN.to_owned());
        assert!(open_registry(&resolved(config, PathBuf::from("/nonexistent"))).is_err());
    }

    #[test]
    fn test_surrealkv_keeps_first_principal() {
        let home = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.registry.registry_principal = Some("ST2TEST".to_owned());
        {
            let registry = open_registry(&resolved(config.clone(), home.path().into())).unwrap();
            registry.close().unwrap();
        }
        assert!(home.path().join("data").join(REGISTRY_DIR_NAME).exists());

        config.registry.registry_principal = Some("ST9OTHER".to_owned());
        let registry = open_registry(&resolved(config, home.path().into())).unwrap();
        assert_eq!(
            registry.config().registry_principal,
            Some(Principal::new("ST2TEST").unwrap())
        );
    }
}
