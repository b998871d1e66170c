//! CLI handlers for the `verdant config` subcommand.

use anyhow::Result;
use serde_json::json;
use verdant_config::{ResolvedConfig, ShowFormat};
use verdant_registry::{Amount, AuditRegistry, Principal};

use crate::formatter::{OutputFormat, print_json};
use crate::theme::Theme;

/// Show the resolved file configuration and the live registry settings.
pub(crate) fn show_config(
    resolved: &ResolvedConfig,
    registry: &AuditRegistry,
    section: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let live = registry.config();

    match format {
        OutputFormat::Json => {
            let file = resolved
                .show(ShowFormat::Json, section)
                .map_err(|e| anyhow::anyhow!("failed to format config: {e}"))?;
            let file: serde_json::Value = serde_json::from_str(&file)?;
            print_json(&json!({ "registry": live, "config": file }))
        },
        OutputFormat::Pretty => {
            println!("\n{}", Theme::header("Registry"));
            println!("{}", Theme::separator());
            let principal = live
                .registry_principal
                .as_ref()
                .map_or_else(|| Theme::dimmed("(not set)"), ToString::to_string);
            println!("{}", Theme::kv("Registry principal", &principal));
            println!("{}", Theme::kv("Submission fee", &live.submission_fee.to_string()));
            println!(
                "{}",
                Theme::kv(
                    "Audits",
                    &format!("{} of {}", registry.get_audit_count(), live.max_audits)
                )
            );
            println!(
                "{}",
                Theme::kv("Data directory", &resolved.data_dir().display().to_string())
            );
            println!();

            let output = resolved
                .show(ShowFormat::Toml, section)
                .map_err(|e| anyhow::anyhow!("failed to format config: {e}"))?;
            println!("{output}");
            Ok(())
        },
    }
}

/// Validate the configuration without opening the registry.
pub(crate) fn validate_config(resolved: &ResolvedConfig, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "valid": true,
            "loaded_files": resolved.loaded_files,
        })),
        OutputFormat::Pretty => {
            println!("{}", Theme::success("Configuration is valid."));
            if resolved.loaded_files.is_empty() {
                println!("{}", Theme::dimmed("No config file found, using defaults."));
            } else {
                println!("\nLoaded files:");
                for path in &resolved.loaded_files {
                    println!("  - {path}");
                }
            }
            Ok(())
        },
    }
}

/// Latch the registry principal.
pub(crate) fn set_principal(
    registry: &AuditRegistry,
    principal: &str,
    format: OutputFormat,
) -> Result<()> {
    let principal = Principal::new(principal)?;
    registry.set_registry_principal(principal.clone())?;

    match format {
        OutputFormat::Json => print_json(&registry.config()),
        OutputFormat::Pretty => {
            println!(
                "{}",
                Theme::success(&format!("Registry principal set to {principal}"))
            );
            println!(
                "{}",
                Theme::warning("The registry principal can never be changed again.")
            );
            Ok(())
        },
    }
}

/// Change the submission fee.
pub(crate) fn set_fee(registry: &AuditRegistry, fee: Amount, format: OutputFormat) -> Result<()> {
    registry.set_submission_fee(fee)?;

    match format {
        OutputFormat::Json => print_json(&registry.config()),
        OutputFormat::Pretty => {
            println!("{}", Theme::success(&format!("Submission fee set to {fee}")));
            Ok(())
        },
    }
}
