//! Record factories
//!
//! A shelf mints new, unsaved records. Identity generation lives here so the
//! collection itself never decides what a uuid looks like.

use uuid::Uuid;

use crate::models::Record;

/// Factory for fresh records
pub trait Shelf {
    /// Create a new record in `language` with a freshly minted uuid
    fn create(&self, language: &str) -> Record;
}

/// Plain text documents identified by random (v4) UUIDs
#[derive(Debug, Clone, Copy, Default)]
pub struct TextShelf;

impl Shelf for TextShelf {
    fn create(&self, language: &str) -> Record {
        Record::with_language(Uuid::new_v4().to_string(), language, String::new())
    }
}
