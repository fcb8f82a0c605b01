//! In-memory backend: useful for testing and throwaway sessions.

use async_trait::async_trait;
use chrono::Utc;
use docbot_core::error::HistoryError;
use docbot_core::history::{Exchange, HistoryStore, User};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    exchanges: Vec<Exchange>,
}

/// A history store that keeps users and exchanges in vectors.
/// Ids are assigned sequentially from 1, like SQLite rowids.
#[derive(Clone, Default)]
pub struct InMemoryHistory {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct users seen so far.
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get_or_create_user(
        &self,
        telegram_id: &str,
        username: Option<&str>,
    ) -> Result<User, HistoryError> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.iter_mut().find(|u| u.telegram_id == telegram_id) {
            if let Some(name) = username {
                user.username = Some(name.to_string());
            }
            return Ok(user.clone());
        }

        let user = User {
            id: tables.users.len() as i64 + 1,
            telegram_id: telegram_id.to_string(),
            username: username.map(String::from),
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn save_exchange(
        &self,
        user: &User,
        question: &str,
        answer: &str,
    ) -> Result<Exchange, HistoryError> {
        let mut tables = self.tables.write().await;
        if !tables.users.iter().any(|u| u.id == user.id) {
            return Err(HistoryError::Storage(format!("Unknown user id {}", user.id)));
        }
        let exchange = Exchange {
            id: tables.exchanges.len() as i64 + 1,
            user_id: user.id,
            question: question.to_string(),
            answer: answer.to_string(),
            created_at: Utc::now(),
        };
        tables.exchanges.push(exchange.clone());
        Ok(exchange)
    }

    async fn recent_exchanges(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<Exchange>, HistoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .exchanges
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_exchanges(&self) -> Result<usize, HistoryError> {
        Ok(self.tables.read().await.exchanges.len())
    }
}
