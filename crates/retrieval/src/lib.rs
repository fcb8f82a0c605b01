//! Lexical retrieval engine for DocBot.
//!
//! Picks the documentation files relevant to a free-text question and packs
//! them into a bounded context string for the completion prompt.
//!
//! # Flow
//!
//! 1. [`DirectoryStore`] re-reads the corpus folder on every call
//! 2. [`Scorer`] counts question-term occurrences in each document
//! 3. [`ContextAssembler`] ranks by `(score desc, load order)`, keeps `top_k`,
//!    and appends excerpts until the next one would overflow the budget
//!
//! Everything here is synchronous and deterministic: no embeddings, no
//! caching, no network.

pub mod assembler;
pub mod loader;
pub mod scorer;

pub use assembler::{
    ContextAssembler, DEFAULT_MAX_CONTEXT_CHARS, DEFAULT_TOP_K, ExcerptInfo, Retrieval,
    excerpt_header,
};
pub use docbot_config::DEFAULT_TERM_PATTERN;
pub use loader::{DirectoryStore, InMemoryStore};
pub use scorer::{DEFAULT_MIN_TERM_LEN, Scorer, score_document};
