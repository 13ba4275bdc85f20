//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::Result;
use serde::Serialize;

use historia_core::{CommitReceipt, MergeSummary, Record, TransactionEntry};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a single record
    pub fn print_record(&self, record: &Record) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("UUID:     {}", record.uuid);
                println!("Language: {}", record.language);
                println!("Updated:  {}", record.updated.format("%Y-%m-%d %H:%M:%S"));
                println!();
                println!("{}", record.document);
            }
            OutputFormat::Json => print_json(record)?,
            OutputFormat::Quiet => println!("{}", record.document),
        }
        Ok(())
    }

    /// Print a list of records
    pub fn print_records(&self, records: &[Record]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if records.is_empty() {
                    println!("No records found.");
                    return Ok(());
                }
                for record in records {
                    println!(
                        "{} | {} | {}",
                        record.uuid,
                        record.updated.format("%Y-%m-%d %H:%M"),
                        truncate_line(&record.document, 50)
                    );
                }
                println!("\n{} record(s)", records.len());
            }
            OutputFormat::Json => print_json(&records)?,
            OutputFormat::Quiet => {
                for record in records {
                    println!("{}", record.uuid);
                }
            }
        }
        Ok(())
    }

    pub fn print_receipt(&self, receipt: &CommitReceipt) -> Result<()> {
        match self.format {
            OutputFormat::Human => println!(
                "✓ Committed {} ({} added, {} deleted)",
                receipt.id, receipt.added, receipt.deleted
            ),
            OutputFormat::Json => print_json(receipt)?,
            OutputFormat::Quiet => println!("{}", receipt.id),
        }
        Ok(())
    }

    pub fn print_merge(&self, branch: &str, summary: &MergeSummary) -> Result<()> {
        match self.format {
            OutputFormat::Human => println!(
                "✓ Merged '{}' into default ({} merged, {} deleted)",
                branch, summary.merged, summary.deleted
            ),
            OutputFormat::Json => print_json(summary)?,
            OutputFormat::Quiet => println!("{}", summary.id),
        }
        Ok(())
    }

    /// Print audit entries, newest first
    pub fn print_transactions(&self, entries: &[TransactionEntry]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No transactions recorded.");
                    return Ok(());
                }
                for entry in entries {
                    println!("────────────────────────────────────────");
                    println!(
                        "{}  {}  [{}]",
                        &entry.id[..8.min(entry.id.len())],
                        entry.created.format("%Y-%m-%d %H:%M:%S"),
                        entry.workspace
                    );
                    println!("Author:  {}", entry.author.as_deref().unwrap_or("(none)"));
                    if let Some(ref message) = entry.message {
                        println!("Message: {}", message);
                    }
                    println!(
                        "Added: {}  Deleted: {}",
                        count(&entry.summary["added"]),
                        count(&entry.summary["deleted"])
                    );
                }
                println!("\n{} transaction(s)", entries.len());
            }
            OutputFormat::Json => print_json(&entries)?,
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.id);
                }
            }
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn count(list: &serde_json::Value) -> usize {
    list.as_array().map(Vec::len).unwrap_or(0)
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer sentence", 10), "a longe...");
        assert_eq!(truncate("bonjour à tous", 10), "bonjour...");
    }

    #[test]
    fn test_truncate_line_uses_first_line() {
        assert_eq!(truncate_line("first\nsecond", 20), "first");
        assert_eq!(truncate_line("", 20), "");
    }

    #[test]
    fn test_count_summary_list() {
        let summary = serde_json::json!({"added": [{"uuid": "1"}, {"uuid": "2"}]});
        assert_eq!(count(&summary["added"]), 2);
        assert_eq!(count(&summary["deleted"]), 0);
    }
}
