//! The answering pipeline of DocBot.
//!
//! A question goes through three steps:
//!
//! 1. **Retrieve** documentation excerpts with the lexical retrieval engine
//! 2. **Prompt** the model with a system instruction that carries the excerpts
//! 3. **Complete** through the configured provider and hand the text back
//!
//! There is no conversation state: every question is answered on its own.
//! [`BotHandler`] wraps the pipeline for chat channels and logs each exchange.

pub mod bot;
pub mod patterns;

pub use bot::{BotHandler, Outcome};
pub use patterns::{RagAnswer, RagAssistant};
