//! Verdant Telemetry - logging for the Verdant audit registry.
//!
//! Wraps `tracing-subscriber` setup behind a serializable [`LogConfig`]:
//! level and per-target directives, four output formats, and stdout, stderr
//! or a rotating log file as the target.
//!
//! # Example
//!
//! ```rust,no_run
//! use verdant_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), verdant_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("verdant_registry=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("registry starting");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
