//! CLI theme and styling.

use colored::Colorize;

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().green())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(50).dimmed().to_string()
    }

    /// Format an aligned key-value pair.
    pub(crate) fn kv(key: &str, value: &str) -> String {
        format!("  {:<20} {}", format!("{key}:").bold(), value)
    }

    /// Format an audit id.
    pub(crate) fn audit_id(id: u64) -> String {
        format!("#{id}").cyan().to_string()
    }

    /// Format a content hash, shortened to its first 16 hex digits.
    pub(crate) fn hash(hex: &str) -> String {
        let short = hex.get(..16).unwrap_or(hex);
        format!("{short}…").cyan().to_string()
    }
}
