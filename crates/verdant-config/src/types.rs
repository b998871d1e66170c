//! Configuration struct definitions.
//!
//! Every section derives `Default` with the same values as the embedded
//! `defaults.toml`, so a partially specified file deserializes cleanly.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registry capacity, fee and principal.
    pub registry: RegistrySection,
    /// Which principals may submit.
    pub oracle: OracleSection,
    /// Persistence backend.
    pub storage: StorageSection,
    /// Logging and tracing.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// RegistrySection
// ---------------------------------------------------------------------------

/// Registry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    /// Capacity ceiling.
    pub max_audits: u64,
    /// Fee charged per admitted audit.
    pub submission_fee: u64,
    /// Principal that receives fees. Latched on first start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_principal: Option<String>,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            max_audits: 10_000,
            submission_fee: 500,
            registry_principal: None,
        }
    }
}

// ---------------------------------------------------------------------------
// OracleSection
// ---------------------------------------------------------------------------

/// Static authorization oracle settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSection {
    /// Principals allowed to submit audits.
    pub verified: Vec<String>,
}

// ---------------------------------------------------------------------------
// StorageSection
// ---------------------------------------------------------------------------

/// Persistence backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// `"surrealkv"` or `"memory"`.
    pub backend: String,
    /// Data directory. `None` uses `<verdant home>/data`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: "surrealkv".to_owned(),
            path: None,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["verdant_registry=debug"]`).
    pub directives: Vec<String>,
    /// Directory for daily-rotated log files. `None` logs to stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            log_dir: None,
        }
    }
}
