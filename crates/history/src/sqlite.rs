//! SQLite backend.
//!
//! Two tables:
//! - `users`: one row per chat user, keyed by the platform id
//! - `messages`: one row per answered question, owned by a user
//!
//! Timestamps are stored as RFC 3339 text.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docbot_core::error::HistoryError;
use docbot_core::history::{Exchange, HistoryStore, User};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// A SQLite-backed question/answer log.
pub struct SqliteHistory {
    pool: SqlitePool,
}

impl SqliteHistory {
    /// Open (or create) the database at `path`.
    ///
    /// Missing parent directories are created. Pass `":memory:"` for an
    /// in-process ephemeral database.
    pub async fn new(path: &str) -> Result<Self, HistoryError> {
        let in_memory = path == ":memory:";
        if !in_memory
            && let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                HistoryError::Storage(format!("Cannot create {}: {e}", parent.display()))
            })?;
        }

        let mut options = SqliteConnectOptions::from_str(path)
            .map_err(|e| HistoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);
        if !in_memory {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite history initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), HistoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                telegram_id  TEXT UNIQUE NOT NULL,
                username     TEXT,
                created_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::MigrationFailed(format!("users table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id      INTEGER NOT NULL REFERENCES users(id),
                question     TEXT NOT NULL,
                answer       TEXT NOT NULL,
                created_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::MigrationFailed(format!("messages table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_user_id ON messages(user_id, id DESC)")
            .execute(&self.pool)
            .await
            .map_err(|e| HistoryError::MigrationFailed(format!("user_id index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn parse_timestamp(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|e| {
                warn!(value = raw, error = %e, "Unparseable timestamp in history");
                Utc::now()
            })
    }

    fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, HistoryError> {
        let created_at: String = row
            .try_get("created_at")
            .map_err(|e| HistoryError::QueryFailed(format!("created_at column: {e}")))?;
        Ok(User {
            id: row
                .try_get("id")
                .map_err(|e| HistoryError::QueryFailed(format!("id column: {e}")))?,
            telegram_id: row
                .try_get("telegram_id")
                .map_err(|e| HistoryError::QueryFailed(format!("telegram_id column: {e}")))?,
            username: row
                .try_get("username")
                .map_err(|e| HistoryError::QueryFailed(format!("username column: {e}")))?,
            created_at: Self::parse_timestamp(&created_at),
        })
    }

    fn row_to_exchange(row: &sqlx::sqlite::SqliteRow) -> Result<Exchange, HistoryError> {
        let created_at: String = row
            .try_get("created_at")
            .map_err(|e| HistoryError::QueryFailed(format!("created_at column: {e}")))?;
        Ok(Exchange {
            id: row
                .try_get("id")
                .map_err(|e| HistoryError::QueryFailed(format!("id column: {e}")))?,
            user_id: row
                .try_get("user_id")
                .map_err(|e| HistoryError::QueryFailed(format!("user_id column: {e}")))?,
            question: row
                .try_get("question")
                .map_err(|e| HistoryError::QueryFailed(format!("question column: {e}")))?,
            answer: row
                .try_get("answer")
                .map_err(|e| HistoryError::QueryFailed(format!("answer column: {e}")))?,
            created_at: Self::parse_timestamp(&created_at),
        })
    }
}

#[async_trait]
impl HistoryStore for SqliteHistory {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get_or_create_user(
        &self,
        telegram_id: &str,
        username: Option<&str>,
    ) -> Result<User, HistoryError> {
        // A known user keeps their stored name unless a new one is given.
        sqlx::query(
            r#"
            INSERT INTO users (telegram_id, username, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(telegram_id) DO UPDATE SET
                username = COALESCE(excluded.username, users.username)
            "#,
        )
        .bind(telegram_id)
        .bind(username)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::Storage(format!("User upsert failed: {e}")))?;

        let row = sqlx::query("SELECT * FROM users WHERE telegram_id = ?1")
            .bind(telegram_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| HistoryError::QueryFailed(format!("User lookup: {e}")))?;
        Self::row_to_user(&row)
    }

    async fn save_exchange(
        &self,
        user: &User,
        question: &str,
        answer: &str,
    ) -> Result<Exchange, HistoryError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO messages (user_id, question, answer, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(user.id)
        .bind(question)
        .bind(answer)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::Storage(format!("INSERT failed: {e}")))?;

        let id = result.last_insert_rowid();
        debug!(user_id = user.id, exchange_id = id, "Exchange saved");
        Ok(Exchange {
            id,
            user_id: user.id,
            question: question.to_string(),
            answer: answer.to_string(),
            created_at,
        })
    }

    async fn recent_exchanges(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<Exchange>, HistoryError> {
        let rows = sqlx::query("SELECT * FROM messages WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2")
            .bind(user_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| HistoryError::QueryFailed(format!("Recent exchanges: {e}")))?;
        rows.iter().map(Self::row_to_exchange).collect()
    }

    async fn count_exchanges(&self) -> Result<usize, HistoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM messages")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| HistoryError::QueryFailed(format!("COUNT: {e}")))?;
        let count: i64 = row
            .try_get("cnt")
            .map_err(|e| HistoryError::QueryFailed(format!("cnt column: {e}")))?;
        Ok(count as usize)
    }
}
