//! Verdant CLI - environmental audit registry
//!
//! Each invocation loads the layered configuration, opens the registry from
//! its data directory, runs one operation and closes the store again.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use verdant_config::{Config, ConfigResult, ResolvedConfig};
use verdant_registry::{Amount, AuditId, AuditRegistry, Principal, RegistryError};

mod commands;
mod config_bridge;
mod formatter;
mod theme;

use commands::{audit, config};
use formatter::{OutputFormat, print_json};
use theme::Theme;

/// Verdant - environmental audit registry
#[derive(Parser)]
#[command(name = "verdant")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.verdant/config.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Principal acting in this invocation
    #[arg(long, global = true, env = "VERDANT_CALLER")]
    caller: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a new audit and pay the submission fee
    Submit(audit::SubmitArgs),

    /// Amend tonnage and reduction metric of your own audit
    Update {
        /// Audit id
        id: u64,
        /// New tonnage (must be positive)
        tonnage: u64,
        /// New reduction metric, 0 to 100
        reduction_metric: u64,
    },

    /// Show an audit
    Show {
        /// Audit id
        id: u64,
    },

    /// Count admitted audits
    Count,

    /// Check whether a content hash is registered
    Exists {
        /// Content hash as hex
        hash: String,
    },

    /// Show the latest update of an audit
    History {
        /// Audit id
        id: u64,
    },

    /// Show the fee receipt of an audit
    Receipt {
        /// Audit id
        id: u64,
    },

    /// View and manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show registry settings and the resolved configuration with sources
    Show {
        /// Show only a specific section (registry, oracle, storage, logging)
        #[arg(short, long)]
        section: Option<String>,
    },
    /// Validate the current configuration
    Validate,
    /// Latch the registry principal (only once)
    SetPrincipal {
        /// Principal receiving submission fees
        principal: String,
    },
    /// Change the submission fee
    SetFee {
        /// New fee
        fee: Amount,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = cli.format;

    let resolved = Config::load(cli.config.as_deref());
    setup_logging(resolved.as_ref().ok(), cli.verbose);

    match run(cli, resolved) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e, format);
            ExitCode::FAILURE
        },
    }
}

/// Set up logging from config, with `--verbose` override.
fn setup_logging(resolved: Option<&ResolvedConfig>, verbose: bool) {
    let mut log_config = resolved.map_or_else(
        || verdant_telemetry::LogConfig::new("warn"),
        |r| config_bridge::to_log_config(&r.config),
    );
    if verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = verdant_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }
}

fn run(cli: Cli, resolved: ConfigResult<ResolvedConfig>) -> Result<()> {
    let resolved = resolved.context("failed to load configuration")?;
    dispatch(&resolved, cli.command, cli.caller.as_deref(), cli.format)
}

fn dispatch(
    resolved: &ResolvedConfig,
    command: Commands,
    caller: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    match command {
        Commands::Submit(args) => {
            let caller = require_caller(caller)?;
            with_registry(resolved, |r| audit::submit(r, &caller, args, format))
        },
        Commands::Update {
            id,
            tonnage,
            reduction_metric,
        } => {
            let caller = require_caller(caller)?;
            with_registry(resolved, |r| {
                audit::update(r, &caller, AuditId(id), tonnage, reduction_metric, format)
            })
        },
        Commands::Show { id } => with_registry(resolved, |r| audit::show(r, AuditId(id), format)),
        Commands::Count => with_registry(resolved, |r| audit::count(r, format)),
        Commands::Exists { hash } => with_registry(resolved, |r| audit::exists(r, &hash, format)),
        Commands::History { id } => {
            with_registry(resolved, |r| audit::history(r, AuditId(id), format))
        },
        Commands::Receipt { id } => {
            with_registry(resolved, |r| audit::receipt(r, AuditId(id), format))
        },
        Commands::Config { command } => handle_config(resolved, command, format),
    }
}

fn handle_config(
    resolved: &ResolvedConfig,
    command: ConfigCommands,
    format: OutputFormat,
) -> Result<()> {
    match command {
        ConfigCommands::Show { section } => with_registry(resolved, |r| {
            config::show_config(resolved, r, section.as_deref(), format)
        }),
        // Validation never touches the data directory.
        ConfigCommands::Validate => config::validate_config(resolved, format),
        ConfigCommands::SetPrincipal { principal } => {
            with_registry(resolved, |r| config::set_principal(r, &principal, format))
        },
        ConfigCommands::SetFee { fee } => {
            with_registry(resolved, |r| config::set_fee(r, fee, format))
        },
    }
}

/// Open the registry, run `f` against it and close the store again.
fn with_registry<T>(
    resolved: &ResolvedConfig,
    f: impl FnOnce(&AuditRegistry) -> Result<T>,
) -> Result<T> {
    let registry = config_bridge::open_registry(resolved)?;
    let result = f(&registry);
    registry.close()?;
    result
}

/// Parse `--caller` / `VERDANT_CALLER`.
fn require_caller(caller: Option<&str>) -> Result<Principal> {
    let caller = caller.context("this command needs --caller or VERDANT_CALLER")?;
    Principal::new(caller).with_context(|| format!("invalid caller '{caller}'"))
}

/// Print an error, with its stable code when the registry raised it.
fn report_error(e: &anyhow::Error, format: OutputFormat) {
    let code = e.downcast_ref::<RegistryError>().map(RegistryError::code);

    match format {
        OutputFormat::Json => {
            let body = serde_json::json!({
                "error": { "code": code, "message": format!("{e:#}") }
            });
            if print_json(&body).is_err() {
                eprintln!("{e:#}");
            }
        },
        OutputFormat::Pretty => {
            let message = match code {
                Some(code) => format!("error[{code}]: {e:#}"),
                None => format!("error: {e:#}"),
            };
            eprintln!("{}", Theme::error(&message));
        },
    }
}
