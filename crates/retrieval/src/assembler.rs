//! Context assembly: rank the corpus and pack excerpts under a budget.
//!
//! ```text
//! load → score → keep score > 0 (else every doc at score 1)
//!      → sort by (score desc, load index) → take top_k
//!      → append "\n\n### Документ: {name}\n{body}" while it fits
//! ```
//!
//! Packing is greedy with a hard stop: the first excerpt that would push the
//! context past `max_context_chars` ends assembly. Excerpts are never cut and
//! smaller later excerpts are not tried.

use std::cmp::Reverse;
use std::sync::Arc;

use docbot_config::RetrievalConfig;
use docbot_core::document::{Document, DocumentStore, ScoredDocument};
use serde::Serialize;
use tracing::debug;

use crate::loader::DirectoryStore;
use crate::scorer::Scorer;

/// Documents included in a context unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 3;

/// Context budget in characters (Unicode scalar values).
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 3000;

/// Header line that introduces one document inside the context.
pub fn excerpt_header(name: &str) -> String {
    format!("\n\n### Документ: {name}\n")
}

/// One excerpt that made it into the context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcerptInfo {
    pub name: String,
    pub score: u64,
    /// Header plus body, in characters
    pub chars: usize,
}

/// The outcome of one retrieval call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Retrieval {
    /// The assembled context (possibly empty)
    pub context: String,

    /// Excerpts in the order they appear in `context`
    pub excerpts: Vec<ExcerptInfo>,

    /// No document matched any question term; ranking fell back to load order
    pub fallback: bool,

    /// Ranked documents considered after the `top_k` cut
    pub candidates: usize,

    /// Documents in the store at call time
    pub corpus_size: usize,
}

impl Retrieval {
    /// Candidates dropped because the budget ran out.
    pub fn dropped_for_budget(&self) -> usize {
        self.candidates - self.excerpts.len()
    }
}

/// Builds the documentation context for a question.
///
/// Holds no state between calls: each retrieval re-reads the store.
pub struct ContextAssembler {
    store: Arc<dyn DocumentStore>,
    scorer: Scorer,
    max_context_chars: usize,
    top_k: usize,
}

impl ContextAssembler {
    /// Create an assembler over `store` with default scorer and limits.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            scorer: Scorer::default(),
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Directory store, scorer, and limits taken from configuration.
    pub fn from_config(config: &RetrievalConfig) -> Result<Self, regex_lite::Error> {
        let store = DirectoryStore::new(&config.docs_dir).with_extensions(&config.extensions);
        let scorer = Scorer::new(&config.term_pattern, config.min_term_len)?;
        Ok(Self::new(Arc::new(store))
            .with_scorer(scorer)
            .with_max_context_chars(config.max_context_chars)
            .with_top_k(config.top_k))
    }

    pub fn with_scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_max_context_chars(mut self, max_context_chars: usize) -> Self {
        self.max_context_chars = max_context_chars;
        self
    }

    /// Set the `top_k` used by [`ContextAssembler::retrieve_default`].
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn max_context_chars(&self) -> usize {
        self.max_context_chars
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Rank `documents` for `question`.
    ///
    /// Returns every positively scored document ordered by
    /// `(score desc, load index asc)`, or, when nothing scored, every document
    /// at score 1 in load order. The flag is `true` in the second case.
    pub fn rank(&self, question: &str, documents: Vec<Document>) -> (Vec<ScoredDocument>, bool) {
        let terms = self.scorer.terms(question);

        let mut scored: Vec<ScoredDocument> = Vec::with_capacity(documents.len());
        let mut unmatched: Vec<ScoredDocument> = Vec::new();
        for (index, document) in documents.into_iter().enumerate() {
            let score = self.scorer.score_terms(&terms, &document.body);
            let entry = ScoredDocument {
                score,
                index,
                document,
            };
            if score > 0 {
                scored.push(entry);
            } else {
                unmatched.push(entry);
            }
        }

        if scored.is_empty() {
            let fallback = unmatched
                .into_iter()
                .map(|d| ScoredDocument { score: 1, ..d })
                .collect();
            return (fallback, true);
        }

        scored.sort_by_key(|d| (Reverse(d.score), d.index));
        (scored, false)
    }

    /// Assemble the context for `question` from the `top_k` best documents,
    /// with a report of what was included.
    pub fn retrieve(&self, question: &str, top_k: usize) -> Retrieval {
        let documents = self.store.load_documents();
        let corpus_size = documents.len();
        if documents.is_empty() {
            debug!(store = self.store.name(), "Empty corpus, no context");
            return Retrieval::default();
        }

        let (mut ranked, fallback) = self.rank(question, documents);
        ranked.truncate(top_k);

        let mut context = String::new();
        let mut used = 0usize;
        let mut excerpts = Vec::with_capacity(ranked.len());

        for candidate in &ranked {
            let part = format!("{}{}", excerpt_header(candidate.name()), candidate.body());
            let chars = part.chars().count();
            if used + chars > self.max_context_chars {
                debug!(
                    document = candidate.name(),
                    chars,
                    used,
                    budget = self.max_context_chars,
                    "Context budget exhausted"
                );
                break;
            }
            context.push_str(&part);
            used += chars;
            excerpts.push(ExcerptInfo {
                name: candidate.name().to_string(),
                score: candidate.score,
                chars,
            });
        }

        debug!(
            corpus = corpus_size,
            candidates = ranked.len(),
            included = excerpts.len(),
            fallback,
            chars = used,
            "Context assembled"
        );

        Retrieval {
            context,
            excerpts,
            fallback,
            candidates: ranked.len(),
            corpus_size,
        }
    }

    /// Assemble the context string for `question` from the `top_k` best
    /// documents. Empty when the corpus is empty or the first excerpt does
    /// not fit the budget.
    pub fn retrieve_context(&self, question: &str, top_k: usize) -> String {
        self.retrieve(question, top_k).context
    }

    /// [`ContextAssembler::retrieve`] with the configured `top_k`.
    pub fn retrieve_default(&self, question: &str) -> Retrieval {
        self.retrieve(question, self.top_k)
    }
}

impl std::fmt::Debug for ContextAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextAssembler")
            .field("store", &self.store.name())
            .field("scorer", &self.scorer)
            .field("max_context_chars", &self.max_context_chars)
            .field("top_k", &self.top_k)
            .finish()
    }
}
