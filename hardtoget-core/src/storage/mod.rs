pub mod interaction_log;
pub mod player_store;
pub mod pool_store;

pub use interaction_log::InteractionLog;
pub use player_store::PlayerStore;
pub use pool_store::PoolStore;

use crate::error::{EngineError, Result};
use crate::types::Amount;
use rusqlite::{params, Connection};
use std::path::Path;
use tokio::sync::Mutex;

/// Owns the single SQLite connection. Every writer goes through the
/// mutex, so pool mutations are serialized; multi-store settle steps
/// additionally run inside one SQLite transaction on the guarded
/// connection.
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub async fn new(db_path: &Path, jackpot_seed: Amount) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| EngineError::internal(format!("Failed to create directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.init_schema(jackpot_seed).await?;
        Ok(storage)
    }

    async fn init_schema(&self, jackpot_seed: Amount) -> Result<()> {
        let conn = self.conn.lock().await;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS players (
                key TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                balance_cents INTEGER NOT NULL,
                messages_count INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        // Singleton row, id pinned to 1
        conn.execute(
            "CREATE TABLE IF NOT EXISTS pool_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                jackpot_cents INTEGER NOT NULL,
                current_turn_key TEXT,
                total_rounds INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER
            )",
            [],
        )?;

        conn.execute(
            "INSERT OR IGNORE INTO pool_state (id, jackpot_cents, total_rounds) VALUES (1, ?1, 0)",
            params![jackpot_seed.to_cents()],
        )?;

        // Append-only; no UPDATE or DELETE is ever issued against it
        conn.execute(
            "CREATE TABLE IF NOT EXISTS interactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                player_key TEXT NOT NULL,
                message TEXT NOT NULL,
                reply TEXT NOT NULL,
                is_win INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (player_key) REFERENCES players(key)
            )",
            [],
        )?;

        Ok(())
    }

    pub async fn get_connection(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
