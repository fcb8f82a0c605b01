//! Document stores: a folder of text files, and a fixed in-memory list.

use docbot_core::document::{Document, DocumentStore};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Reads every allow-listed file in one directory (non-recursive).
///
/// Files are returned sorted by file name. A missing or unreadable directory
/// yields an empty corpus; files that cannot be read as UTF-8 are skipped.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
    extensions: Vec<String>,
}

impl DirectoryStore {
    /// A store over `dir` loading `*.txt` files.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extensions: vec!["txt".into()],
        }
    }

    /// Replace the extension allow-list. Leading dots are ignored and
    /// matching is case-insensitive.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|allowed| *allowed == ext)
            })
    }

    /// Allow-listed file paths, sorted by name.
    fn list_files(&self) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %self.dir.display(), "Document directory does not exist");
                return Vec::new();
            }
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Document directory unreadable");
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    warn!(dir = %self.dir.display(), error = %e, "Skipping unreadable directory entry");
                    None
                }
            })
            .filter(|path| path.is_file() && self.accepts(path))
            .collect();

        paths.sort();
        paths
    }
}

impl DocumentStore for DirectoryStore {
    fn name(&self) -> &str {
        "directory"
    }

    fn load_documents(&self) -> Vec<Document> {
        let documents: Vec<Document> = self
            .list_files()
            .into_iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_string_lossy().into_owned();
                match std::fs::read_to_string(&path) {
                    Ok(body) => Some(Document::new(name, body)),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping unreadable document");
                        None
                    }
                }
            })
            .collect();

        debug!(dir = %self.dir.display(), count = documents.len(), "Documents loaded");
        documents
    }
}

/// A store over a fixed list of documents, returned in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    documents: Vec<Document>,
}

impl InMemoryStore {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Build from `(name, body)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, body)| Document::new(name, body))
                .collect(),
        )
    }
}

impl DocumentStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn load_documents(&self) -> Vec<Document> {
        self.documents.clone()
    }
}
