use crate::error::Result;
use crate::storage::Storage;
use crate::types::InteractionRecord;
use chrono::Utc;
use rusqlite::{params, Connection};

/// Append-only audit trail of rounds. Also the source of the persona's
/// conversation context via `recent`.
pub struct InteractionLog<'a> {
    storage: &'a Storage,
}

impl<'a> InteractionLog<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn append(
        &self,
        player_key: &str,
        message: &str,
        reply: &str,
        is_win: bool,
    ) -> Result<()> {
        let conn = self.storage.get_connection().await;
        apply_append(&conn, player_key, message, reply, is_win)
    }

    /// Last `n` interactions across all players, oldest first.
    pub async fn recent(&self, n: usize) -> Result<Vec<InteractionRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT id, player_key, message, reply, is_win, created_at
             FROM interactions ORDER BY id DESC LIMIT ?1",
        )?;

        let record_iter = stmt.query_map(params![n as i64], |row| {
            Ok(InteractionRecord {
                id: row.get(0)?,
                player_key: row.get(1)?,
                message: row.get(2)?,
                reply: row.get(3)?,
                is_win: row.get::<_, i64>(4)? != 0,
                created_at: chrono::DateTime::from_timestamp(row.get(5)?, 0)
                    .unwrap_or_else(Utc::now),
            })
        })?;

        let mut records = Vec::new();
        for record in record_iter {
            records.push(record?);
        }
        records.reverse();

        Ok(records)
    }
}

pub(crate) fn apply_append(
    conn: &Connection,
    player_key: &str,
    message: &str,
    reply: &str,
    is_win: bool,
) -> Result<()> {
    conn.execute(
        "INSERT INTO interactions (player_key, message, reply, is_win, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            player_key,
            message,
            reply,
            is_win as i64,
            Utc::now().timestamp(),
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Amount;
    use tempfile::tempdir;

    async fn open_storage() -> (Storage, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let storage = Storage::new(&dir.path().join("test.db"), Amount::from_cents(100_000))
            .await
            .unwrap();
        (storage, dir)
    }

    #[tokio::test]
    async fn recent_returns_the_newest_window_oldest_first() {
        let (storage, _dir) = open_storage().await;
        let players = crate::storage::PlayerStore::new(&storage);
        for key in ["k1", "k2"] {
            players
                .get_or_create(key, None, Amount::from_cents(1_000))
                .await
                .unwrap();
        }
        let log = InteractionLog::new(&storage);

        log.append("k1", "uno", "No.", false).await.unwrap();
        log.append("k2", "due", "Forse.", false).await.unwrap();
        log.append("k1", "tre", "Va bene.", true).await.unwrap();

        let window = log.recent(2).await.unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].message, "due");
        assert_eq!(window[1].message, "tre");
        assert!(window[1].is_win);
        assert!(window[0].id < window[1].id);
    }

    #[tokio::test]
    async fn recent_on_empty_log_is_empty() {
        let (storage, _dir) = open_storage().await;
        let log = InteractionLog::new(&storage);
        assert!(log.recent(10).await.unwrap().is_empty());
    }
}
