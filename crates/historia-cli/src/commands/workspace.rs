//! Workspace command handlers

use anyhow::{Context, Result};

use historia_core::Collection;

use crate::output::Output;

/// Merge a branch workspace into the default workspace
pub fn merge(collection: &Collection, branch: &str, output: &Output) -> Result<()> {
    let summary = collection
        .merge_workspace(branch)
        .with_context(|| format!("Failed to merge workspace '{}'", branch))?;
    output.print_merge(branch, &summary)
}

/// Show recent transactions for the collection
pub fn log(collection: &Collection, limit: usize, output: &Output) -> Result<()> {
    let entries = collection
        .transactions(limit)
        .context("Failed to read transaction log")?;
    output.print_transactions(&entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use historia_core::{Database, Record};

    use crate::output::OutputFormat;

    #[test]
    fn test_merge_publishes_branch() {
        let db = Database::open_in_memory().unwrap();
        let collection = Collection::new(&db, "documents").unwrap();
        let output = Output::new(OutputFormat::Quiet);

        collection
            .for_workspace("draft")
            .save(Record::new("12345", "draft copy"))
            .unwrap();
        merge(&collection, "draft", &output).unwrap();

        assert_eq!(collection.load("12345").unwrap().document, "draft copy");
    }

    #[test]
    fn test_merge_default_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let collection = Collection::new(&db, "documents").unwrap();
        let output = Output::new(OutputFormat::Quiet);

        let err = merge(&collection, "default", &output).unwrap_err();
        assert!(err.to_string().contains("default"));
    }

    #[test]
    fn test_log_lists_commits() {
        let db = Database::open_in_memory().unwrap();
        let collection = Collection::new(&db, "documents").unwrap();
        let output = Output::new(OutputFormat::Quiet);

        collection.save(Record::new("a", "one")).unwrap();
        collection.save(Record::new("b", "two")).unwrap();

        log(&collection, 10, &output).unwrap();
        assert_eq!(collection.transactions(10).unwrap().len(), 2);
    }
}
