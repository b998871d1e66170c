//! Audit commands - submit, amend and inspect registry records.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::json;
use verdant_core::DataHash;
use verdant_registry::{AuditId, AuditRecord, AuditRegistry, Principal, SubmitAudit};

use crate::formatter::{OutputFormat, print_json};
use crate::theme::Theme;

/// Fields of a new audit.
#[derive(Debug, Args)]
pub(crate) struct SubmitArgs {
    /// Content hash as hex (64 digits for a 32-byte hash)
    #[arg(long, required_unless_present = "hash_file", conflicts_with = "hash_file")]
    pub(crate) hash: Option<String>,

    /// Hash this document with BLAKE3 instead of passing --hash
    #[arg(long)]
    pub(crate) hash_file: Option<PathBuf>,

    /// Quantity of waste (must be positive)
    #[arg(long)]
    pub(crate) tonnage: u64,

    /// Waste description, 1 to 50 characters
    #[arg(long)]
    pub(crate) waste_type: String,

    /// Reduction percentage, 0 to 100
    #[arg(long)]
    pub(crate) reduction_metric: u64,

    /// Reporting period (must be positive)
    #[arg(long)]
    pub(crate) period: u64,

    /// organic, recyclable or hazardous
    #[arg(long)]
    pub(crate) category: String,

    /// Audit location, 1 to 100 characters
    #[arg(long)]
    pub(crate) location: String,

    /// kg, ton or lb
    #[arg(long)]
    pub(crate) unit: String,

    /// Origin of the audited data, 1 to 100 characters
    #[arg(long)]
    pub(crate) source: String,

    /// Verification level, 0 to 5
    #[arg(long)]
    pub(crate) verification_level: u64,

    /// Compliance score, 0 to 100
    #[arg(long)]
    pub(crate) compliance_score: u64,
}

impl SubmitArgs {
    /// Resolve the hash and build the raw submission.
    ///
    /// Hex of the wrong length is passed through so the registry reports it.
    fn into_request(self) -> Result<SubmitAudit> {
        let data_hash = match (self.hash, self.hash_file) {
            (Some(hex), _) => hex::decode(hex.trim()).context("--hash is not valid hex")?,
            (None, Some(path)) => {
                let data = std::fs::read(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                DataHash::digest(&data).as_bytes().to_vec()
            },
            (None, None) => anyhow::bail!("either --hash or --hash-file is required"),
        };

        Ok(SubmitAudit {
            data_hash,
            tonnage: self.tonnage,
            waste_type: self.waste_type,
            reduction_metric: self.reduction_metric,
            period: self.period,
            category: self.category,
            location: self.location,
            unit: self.unit,
            source: self.source,
            verification_level: self.verification_level,
            compliance_score: self.compliance_score,
        })
    }
}

/// Submit a new audit and pay the fee.
pub(crate) fn submit(
    registry: &AuditRegistry,
    caller: &Principal,
    args: SubmitArgs,
    format: OutputFormat,
) -> Result<()> {
    let request = args.into_request()?;
    let id = registry.submit_audit(caller, request)?;
    let receipt = registry.fee_receipt(id);

    match format {
        OutputFormat::Json => print_json(&json!({ "id": id, "receipt": receipt })),
        OutputFormat::Pretty => {
            println!(
                "{}",
                Theme::success(&format!("Audit {} admitted", Theme::audit_id(id.get())))
            );
            if let Some(receipt) = receipt {
                println!(
                    "{}",
                    Theme::kv("Fee paid", &format!("{} to {}", receipt.amount, receipt.to))
                );
            }
            Ok(())
        },
    }
}

/// Amend tonnage and reduction metric of an owned audit.
pub(crate) fn update(
    registry: &AuditRegistry,
    caller: &Principal,
    id: AuditId,
    tonnage: u64,
    reduction_metric: u64,
    format: OutputFormat,
) -> Result<()> {
    registry.update_audit(caller, id, tonnage, reduction_metric)?;

    match format {
        OutputFormat::Json => print_json(&registry.get_audit_update(id)),
        OutputFormat::Pretty => {
            println!(
                "{}",
                Theme::success(&format!("Audit {} updated", Theme::audit_id(id.get())))
            );
            Ok(())
        },
    }
}

/// Show one audit.
pub(crate) fn show(registry: &AuditRegistry, id: AuditId, format: OutputFormat) -> Result<()> {
    let record = registry.get_audit(id);

    match (format, record) {
        (OutputFormat::Json, record) => print_json(&record),
        (OutputFormat::Pretty, None) => {
            println!("{}", Theme::info(&format!("No audit with id {id}")));
            Ok(())
        },
        (OutputFormat::Pretty, Some(record)) => {
            print_record(&record);
            Ok(())
        },
    }
}

fn print_record(record: &AuditRecord) {
    println!(
        "\n{} {}",
        Theme::header("Audit"),
        Theme::audit_id(record.id.get())
    );
    println!("{}", Theme::separator());
    println!("{}", Theme::kv("Submitter", record.submitter.as_str()));
    println!("{}", Theme::kv("Data hash", &record.data_hash.to_hex()));
    println!(
        "{}",
        Theme::kv("Tonnage", &format!("{} {}", record.tonnage, record.unit))
    );
    println!("{}", Theme::kv("Waste type", &record.waste_type));
    println!(
        "{}",
        Theme::kv("Reduction", &format!("{}%", record.reduction_metric))
    );
    println!("{}", Theme::kv("Period", &record.period.to_string()));
    println!("{}", Theme::kv("Category", record.category.as_str()));
    println!("{}", Theme::kv("Location", &record.location));
    println!("{}", Theme::kv("Source", &record.source));
    println!(
        "{}",
        Theme::kv(
            "Verification level",
            &format!("{}/5", record.verification_level)
        )
    );
    println!(
        "{}",
        Theme::kv("Compliance score", &format!("{}/100", record.compliance_score))
    );
    println!("{}", Theme::kv("Last write", &record.timestamp.to_string()));
    let status = if record.status {
        "active".green().to_string()
    } else {
        "inactive".dimmed().to_string()
    };
    println!("{}", Theme::kv("Status", &status));
    println!();
}

/// Print the number of admitted audits.
pub(crate) fn count(registry: &AuditRegistry, format: OutputFormat) -> Result<()> {
    let count = registry.get_audit_count();
    let max = registry.config().max_audits;

    match format {
        OutputFormat::Json => print_json(&json!({ "count": count, "max_audits": max })),
        OutputFormat::Pretty => {
            println!("{count} {}", Theme::dimmed(&format!("of {max} audits")));
            Ok(())
        },
    }
}

/// Report whether a hash is registered.
///
/// Hex that decodes to the wrong length is simply not registered.
pub(crate) fn exists(registry: &AuditRegistry, hash: &str, format: OutputFormat) -> Result<()> {
    let bytes = hex::decode(hash.trim()).context("hash is not valid hex")?;
    let id = registry.find_by_hash(&bytes);

    match format {
        OutputFormat::Json => print_json(&json!({ "exists": id.is_some(), "id": id })),
        OutputFormat::Pretty => {
            match id {
                Some(id) => println!(
                    "{}",
                    Theme::success(&format!(
                        "{} is registered as {}",
                        Theme::hash(hash),
                        Theme::audit_id(id.get())
                    ))
                ),
                None => println!(
                    "{}",
                    Theme::info(&format!("{} is not registered", Theme::hash(hash)))
                ),
            }
            Ok(())
        },
    }
}

/// Show the latest amendment of an audit.
pub(crate) fn history(registry: &AuditRegistry, id: AuditId, format: OutputFormat) -> Result<()> {
    let update = registry.get_audit_update(id);

    match (format, update) {
        (OutputFormat::Json, update) => print_json(&update),
        (OutputFormat::Pretty, None) => {
            println!(
                "{}",
                Theme::info(&format!(
                    "Audit {} has never been updated",
                    Theme::audit_id(id.get())
                ))
            );
            Ok(())
        },
        (OutputFormat::Pretty, Some(update)) => {
            println!(
                "\n{} {}",
                Theme::header("Latest update of audit"),
                Theme::audit_id(id.get())
            );
            println!("{}", Theme::separator());
            println!("{}", Theme::kv("Updater", update.updater.as_str()));
            println!("{}", Theme::kv("Tonnage", &update.tonnage.to_string()));
            println!(
                "{}",
                Theme::kv("Reduction", &format!("{}%", update.reduction_metric))
            );
            println!("{}", Theme::kv("At", &update.timestamp.to_string()));
            println!();
            Ok(())
        },
    }
}

/// Show the fee receipt of an audit.
pub(crate) fn receipt(registry: &AuditRegistry, id: AuditId, format: OutputFormat) -> Result<()> {
    let receipt = registry.fee_receipt(id);

    match (format, receipt) {
        (OutputFormat::Json, receipt) => print_json(&receipt),
        (OutputFormat::Pretty, None) => {
            println!("{}", Theme::info(&format!("No receipt for audit {id}")));
            Ok(())
        },
        (OutputFormat::Pretty, Some(receipt)) => {
            println!(
                "\n{} {}",
                Theme::header("Fee receipt for audit"),
                Theme::audit_id(id.get())
            );
            println!("{}", Theme::separator());
            println!("{}", Theme::kv("Amount", &receipt.amount.to_string()));
            println!("{}", Theme::kv("From", receipt.from.as_str()));
            println!("{}", Theme::kv("To", receipt.to.as_str()));
            println!("{}", Theme::kv("At", &receipt.at.to_string()));
            println!();
            Ok(())
        },
    }
}
