//! Document domain types and the store abstraction.
//!
//! A [`Document`] is one file of the documentation corpus. Stores hand out a
//! fresh `Vec<Document>` on every call; nothing is cached between retrievals.

use serde::{Deserialize, Serialize};

/// One document of the corpus: a name (usually the file name) and its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier shown in the excerpt header
    pub name: String,

    /// Full text
    pub body: String,
}

impl Document {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }
}

/// A document paired with its lexical score for one retrieval call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredDocument {
    /// Raw term-frequency score
    pub score: u64,

    /// Position of the document in the store's enumeration order
    pub index: usize,

    pub document: Document,
}

impl ScoredDocument {
    pub fn name(&self) -> &str {
        &self.document.name
    }

    pub fn body(&self) -> &str {
        &self.document.body
    }
}

/// A source of documents.
///
/// Implementations must re-read their backing storage on every call and
/// must not fail: unreadable entries are skipped, a missing store yields an
/// empty corpus.
pub trait DocumentStore: Send + Sync {
    /// A human-readable name for this store (e.g., "directory", "memory").
    fn name(&self) -> &str;

    /// Load the full corpus in the store's enumeration order.
    fn load_documents(&self) -> Vec<Document>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_serialization() {
        let doc = Document::new("crm.deal.add.txt", "Метод создаёт сделку");
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("crm.deal.add.txt"));
        assert!(json.contains("сделку"));
    }

    #[test]
    fn scored_document_accessors() {
        let scored = ScoredDocument {
            score: 4,
            index: 2,
            document: Document::new("a.txt", "body"),
        };
        assert_eq!(scored.name(), "a.txt");
        assert_eq!(scored.body(), "body");
    }
}
