//! Answering patterns.
//!
//! Only retrieval-augmented generation is implemented: the model sees the
//! retrieved documentation and the question, nothing else.

pub mod rag;

pub use rag::{RagAnswer, RagAssistant};

#[cfg(test)]
pub(crate) mod test_helpers;
