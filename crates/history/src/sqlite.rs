//! SQLite history backend.
//!
//! One row per message. `seq` is an autoincrement key so transcripts read
//! back in exactly the order they were appended, regardless of timestamps.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use voxloop_core::error::HistoryError;
use voxloop_core::history::HistoryStore;
use voxloop_core::message::{ConversationId, Message};

pub struct SqliteHistory {
    pool: SqlitePool,
}

impl SqliteHistory {
    /// Open (creating if missing) the database at `url`, e.g.
    /// `sqlite:///home/me/.voxloop/history.db`.
    pub async fn new(url: &str) -> Result<Self, HistoryError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| HistoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let backend = Self { pool };
        backend.run_migrations().await?;
        info!("SQLite history backend initialized at {url}");
        Ok(backend)
    }

    async fn run_migrations(&self) -> Result<(), HistoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                seq             INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id TEXT NOT NULL,
                message         TEXT NOT NULL,
                created_at      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::MigrationFailed(format!("messages table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, seq)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::MigrationFailed(format!("conversation index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SqliteHistory {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn append(&self, id: &ConversationId, message: Message) -> Result<(), HistoryError> {
        let body = serde_json::to_string(&message)
            .map_err(|e| HistoryError::Storage(format!("Failed to serialize message: {e}")))?;

        sqlx::query("INSERT INTO messages (conversation_id, message, created_at) VALUES (?, ?, ?)")
            .bind(id.as_str())
            .bind(body)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| HistoryError::Storage(format!("Insert failed: {e}")))?;
        Ok(())
    }

    async fn get(&self, id: &ConversationId) -> Result<Vec<Message>, HistoryError> {
        let rows = sqlx::query("SELECT seq, message FROM messages WHERE conversation_id = ? ORDER BY seq ASC")
            .bind(id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| HistoryError::Storage(format!("Query failed: {e}")))?;

        rows.iter()
            .map(|row| {
                let seq: i64 = row.get("seq");
                let body: String = row.get("message");
                serde_json::from_str(&body)
                    .map_err(|e| HistoryError::Corrupted(format!("row {seq}: {e}")))
            })
            .collect()
    }
}
