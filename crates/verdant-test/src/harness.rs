//! Test harness helpers.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use tracing_subscriber::EnvFilter;
use verdant_registry::{AuditRegistry, RegistryBuilder};

use crate::fixtures::{test_registry_principal, test_submitter};
use crate::mocks::{ManualClock, MockOracle, RecordingTransfer};

/// Create a temporary directory for testing.
///
/// # Panics
///
/// Panics if the temporary directory cannot be created.
#[must_use]
pub fn test_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Create a file within a temporary directory.
///
/// # Panics
///
/// Panics if the file cannot be written.
#[must_use]
pub fn test_file_in_dir(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write file");
    path
}

/// Set up test logging with the given filter.
pub fn setup_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

/// A registry wired to mock collaborators.
///
/// The oracle verifies [`test_submitter`]; the clock starts at 1.
pub struct TestRegistry {
    /// The registry under test.
    pub registry: AuditRegistry,
    /// Shared handle to the oracle.
    pub oracle: MockOracle,
    /// Shared handle to the transfer journal.
    pub transfer: RecordingTransfer,
    /// Shared handle to the clock.
    pub clock: Arc<ManualClock>,
}

impl TestRegistry {
    /// Registry with default configuration and no registry principal.
    ///
    /// # Panics
    ///
    /// Panics if the registry cannot be opened.
    #[must_use]
    pub fn new() -> Self {
        Self::with_builder(AuditRegistry::builder())
    }

    /// Registry with the registry principal already set.
    ///
    /// # Panics
    ///
    /// Panics if the registry cannot be opened or configured.
    #[must_use]
    pub fn ready() -> Self {
        let ctx = Self::new();
        ctx.registry
            .set_registry_principal(test_registry_principal())
            .expect("Failed to set registry principal");
        ctx
    }

    /// Registry built from `builder`, with mocks replacing its collaborators.
    ///
    /// # Panics
    ///
    /// Panics if the registry cannot be opened.
    #[must_use]
    pub fn with_builder(builder: RegistryBuilder) -> Self {
        let oracle = MockOracle::new().with_verified(test_submitter());
        let transfer = RecordingTransfer::new();
        let clock = Arc::new(ManualClock::starting_at(1));
        let registry = builder
            .oracle(Arc::new(oracle.clone()))
            .transfer(Arc::new(transfer.clone()))
            .clock(clock.clone())
            .open()
            .expect("Failed to open registry");
        Self {
            registry,
            oracle,
            transfer,
            clock,
        }
    }
}

impl Default for TestRegistry {
    fn default() -> Self {
        Self::new()
    }
}
