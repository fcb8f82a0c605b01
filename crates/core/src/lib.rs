//! # DocBot Core
//!
//! Domain types, traits, and error definitions for the DocBot documentation
//! assistant. This crate has **no framework dependencies**: it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates:
//! - [`DocumentStore`] → `docbot-retrieval` (directory and in-memory stores)
//! - [`Provider`] → `docbot-providers` (Yandex GPT)
//! - [`Channel`] → `docbot-channels` (Telegram, terminal)
//! - [`HistoryStore`] → `docbot-history` (SQLite, in-memory)

pub mod channel;
pub mod document;
pub mod error;
pub mod history;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use channel::{Channel, ChannelId, ChannelMessage};
pub use document::{Document, DocumentStore, ScoredDocument};
pub use error::{Error, Result};
pub use history::{Exchange, HistoryStore, User};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
