//! History trait: the per-user log of questions and answers.
//!
//! Every completed round trip (question in, answer out) is stored against
//! the chat user who asked it. The log is write-mostly; reads exist for the
//! CLI and for tests.

use crate::error::HistoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat user known to the bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Platform user ID (Telegram numeric id as a string)
    pub telegram_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// One logged question/answer pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: i64,
    pub user_id: i64,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

/// The core HistoryStore trait.
///
/// Implementations: SQLite, in-memory (for testing).
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "memory").
    fn name(&self) -> &str;

    /// Look a user up by platform ID, creating the record on first contact.
    async fn get_or_create_user(
        &self,
        telegram_id: &str,
        username: Option<&str>,
    ) -> std::result::Result<User, HistoryError>;

    /// Append a question/answer pair for `user`.
    async fn save_exchange(
        &self,
        user: &User,
        question: &str,
        answer: &str,
    ) -> std::result::Result<Exchange, HistoryError>;

    /// The most recent exchanges of a user, newest first.
    async fn recent_exchanges(
        &self,
        user_id: i64,
        limit: usize,
    ) -> std::result::Result<Vec<Exchange>, HistoryError>;

    /// Total number of logged exchanges across all users.
    async fn count_exchanges(&self) -> std::result::Result<usize, HistoryError>;
}
