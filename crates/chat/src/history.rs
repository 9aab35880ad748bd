//! Chat history storage.
//!
//! Turns are kept behind the [`ChatHistory`] trait. [`SqliteHistory`] stores
//! them in a single SQLite table, either in a file or in memory.

use crate::types::ChatTurn;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, types::Type, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use vecgate_core::{AppError, AppResult};

/// Storage for chat turns.
#[async_trait]
pub trait ChatHistory: Send + Sync {
    /// Persist one turn.
    async fn append(&self, turn: &ChatTurn) -> AppResult<()>;

    /// Every turn of `user_id`, newest first.
    async fn for_user(&self, user_id: &str) -> AppResult<Vec<ChatTurn>>;
}

/// SQLite-backed chat history.
pub struct SqliteHistory {
    conn: Mutex<Connection>,
}

impl SqliteHistory {
    /// Open (or create) the history database at `path`.
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::History(format!("Failed to create history directory: {}", e))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::History(format!("Failed to open {:?}: {}", path, e)))?;
        let history = Self::init(conn)?;
        tracing::debug!("Opened chat history at {:?}", path);
        Ok(history)
    }

    /// History that lives only as long as this value.
    pub fn in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::History(format!("Failed to open in-memory history: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chat_turns (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                user_id TEXT NOT NULL,
                message TEXT NOT NULL,
                response TEXT NOT NULL,
                context TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chat_turns_user ON chat_turns(user_id, created_at);
            "#,
        )
        .map_err(|e| AppError::History(format!("Failed to create tables: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::History("History connection lock poisoned".to_string()))
    }
}

#[async_trait]
impl ChatHistory for SqliteHistory {
    async fn append(&self, turn: &ChatTurn) -> AppResult<()> {
        let context = serde_json::to_string(&turn.context)?;
        // Fixed-width UTC timestamps sort correctly as text
        let created_at = turn.created_at.to_rfc3339_opts(SecondsFormat::Micros, true);

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO chat_turns (id, user_id, message, response, context, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                turn.id,
                turn.user_id,
                turn.message,
                turn.response,
                context,
                created_at
            ],
        )
        .map_err(|e| AppError::History(format!("Failed to save chat turn: {}", e)))?;

        Ok(())
    }

    async fn for_user(&self, user_id: &str) -> AppResult<Vec<ChatTurn>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, message, response, context, created_at
                 FROM chat_turns
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, seq DESC",
            )
            .map_err(|e| AppError::History(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                let context: String = row.get(4)?;
                let context: Vec<String> = serde_json::from_str(&context).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e))
                })?;

                let created_at: String = row.get(5)?;
                let created_at = DateTime::parse_from_rfc3339(&created_at)
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
                    })?
                    .with_timezone(&Utc);

                Ok(ChatTurn {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    message: row.get(2)?,
                    response: row.get(3)?,
                    context,
                    created_at,
                })
            })
            .map_err(|e| AppError::History(format!("Failed to query chat history: {}", e)))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::History(format!("Failed to read chat turn: {}", e)))
    }
}
