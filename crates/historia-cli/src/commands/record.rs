//! Record command handlers
//!
//! Every handler works through the collection view built in `main`, so the
//! language and workspace flags apply uniformly.

use std::io::Read;

use anyhow::{bail, Context, Result};
use tracing::warn;

use historia_core::{Collection, Commit, Record, StorageError, TextShelf};

use crate::output::Output;

/// Author and message recorded in the transaction log
#[derive(Debug, Clone, Default)]
pub struct CommitMeta {
    pub author: Option<String>,
    pub message: Option<String>,
}

impl CommitMeta {
    fn into_commit(self) -> Commit {
        let mut commit = Commit::new();
        if let Some(author) = self.author {
            commit.set_author(author);
        }
        if let Some(message) = self.message {
            commit.set_message(message);
        }
        commit
    }
}

/// Show one or more records
pub fn get(collection: &Collection, uuids: &[String], output: &Output) -> Result<()> {
    if let [uuid] = uuids {
        let record = collection.load(uuid).map_err(with_hint)?;
        return output.print_record(&record);
    }

    let found = collection
        .load_multiple(uuids)
        .context("Failed to load records")?;
    let missing: Vec<&str> = uuids
        .iter()
        .map(String::as_str)
        .filter(|uuid| !found.contains_key(*uuid))
        .collect();
    if !missing.is_empty() {
        warn!("Not visible in this view: {}", missing.join(", "));
    }

    let records: Vec<Record> = found.into_iter().map(|(_, record)| record).collect();
    output.print_records(&records)
}

/// Create or replace the record with the given uuid
pub fn put(
    collection: &Collection,
    uuid: String,
    document: Option<String>,
    meta: CommitMeta,
    output: &Output,
) -> Result<()> {
    let document = document_or_stdin(document)?;
    let record = Record::with_language(uuid, collection.language(), document);

    let mut commit = meta.into_commit();
    commit.add(record);
    let receipt = collection.commit(commit).context("Failed to save record")?;
    output.print_receipt(&receipt)
}

/// Create a record with a freshly minted uuid
pub fn create(
    collection: &Collection,
    document: Option<String>,
    meta: CommitMeta,
    output: &Output,
) -> Result<()> {
    let document = document_or_stdin(document)?;
    let mut record = collection.create(&TextShelf);
    record.set_document(document);
    let uuid = record.uuid.clone();

    let mut commit = meta.into_commit();
    commit.add(record);
    collection.commit(commit).context("Failed to save record")?;

    if output.is_json() {
        println!("{}", serde_json::json!({ "uuid": uuid }));
    } else {
        println!("{}", uuid);
    }
    Ok(())
}

/// Delete a record in the view's workspace
pub fn delete(
    collection: &Collection,
    uuid: String,
    meta: CommitMeta,
    output: &Output,
) -> Result<()> {
    let mut commit = meta.into_commit();
    commit.delete(uuid, collection.language());
    let receipt = collection.commit(commit).context("Failed to delete record")?;
    output.print_receipt(&receipt)
}

/// List every record visible through the view
pub fn list(collection: &Collection, output: &Output) -> Result<()> {
    let records = collection.list().context("Failed to list records")?;
    output.print_records(&records)
}

fn document_or_stdin(document: Option<String>) -> Result<String> {
    match document {
        Some(document) => Ok(document),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read document from stdin")?;
            if buffer.is_empty() {
                bail!("No document given and stdin was empty");
            }
            Ok(buffer)
        }
    }
}

fn with_hint(err: StorageError) -> anyhow::Error {
    match err.recovery_suggestion() {
        Some(hint) => anyhow::anyhow!("{}\n{}", err, hint),
        None => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use historia_core::Database;

    use crate::output::OutputFormat;

    fn setup() -> (Collection, Output) {
        let db = Database::open_in_memory().unwrap();
        let collection = Collection::new(&db, "documents").unwrap();
        (collection, Output::new(OutputFormat::Quiet))
    }

    #[test]
    fn test_put_then_get() {
        let (collection, output) = setup();

        put(
            &collection,
            "12345".to_string(),
            Some("hello".to_string()),
            CommitMeta::default(),
            &output,
        )
        .unwrap();

        assert_eq!(collection.load("12345").unwrap().document, "hello");
        get(&collection, &["12345".to_string()], &output).unwrap();
    }

    #[test]
    fn test_get_missing_reports_not_found() {
        let (collection, output) = setup();

        let err = get(&collection, &["nope".to_string()], &output).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_get_multiple_skips_missing() {
        let (collection, output) = setup();
        collection.save(Record::new("a", "first")).unwrap();

        get(&collection, &["a".to_string(), "b".to_string()], &output).unwrap();
    }

    #[test]
    fn test_put_on_branch_leaves_default_alone() {
        let (collection, output) = setup();
        collection.save(Record::new("12345", "base")).unwrap();
        let draft = collection.for_workspace("draft");

        put(
            &draft,
            "12345".to_string(),
            Some("changed".to_string()),
            CommitMeta::default(),
            &output,
        )
        .unwrap();

        assert_eq!(draft.load("12345").unwrap().document, "changed");
        assert_eq!(collection.load("12345").unwrap().document, "base");
    }

    #[test]
    fn test_create_mints_uuid() {
        let (collection, output) = setup();

        create(&collection, Some("fresh".to_string()), CommitMeta::default(), &output).unwrap();

        let records = collection.list().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].document, "fresh");
        assert!(uuid::Uuid::parse_str(&records[0].uuid).is_ok());
    }

    #[test]
    fn test_delete_hides_record() {
        let (collection, output) = setup();
        collection.save(Record::new("12345", "doomed")).unwrap();

        delete(&collection, "12345".to_string(), CommitMeta::default(), &output).unwrap();

        assert!(collection.load("12345").unwrap_err().is_not_found());
    }

    #[test]
    fn test_commit_meta_lands_in_log() {
        let (collection, output) = setup();
        let meta = CommitMeta {
            author: Some("crell".to_string()),
            message: Some("first draft".to_string()),
        };

        put(&collection, "12345".to_string(), Some("x".to_string()), meta, &output).unwrap();

        let log = collection.transactions(10).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].author.as_deref(), Some("crell"));
        assert_eq!(log[0].message.as_deref(), Some("first draft"));
    }
}
