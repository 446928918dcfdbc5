use crate::error::Result;
use crate::storage::Storage;
use crate::types::{Amount, Player};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

pub const DEFAULT_DISPLAY_NAME: &str = "Anonimo";

/// The player ledger. Balances only ever move through relative SQL
/// updates; "read, compute, write" would lose updates under two
/// near-simultaneous messages from the same player.
pub struct PlayerStore<'a> {
    storage: &'a Storage,
}

impl<'a> PlayerStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Returns the existing record, or creates one with the configured
    /// starting balance. Registration is idempotent through this.
    pub async fn get_or_create(
        &self,
        key: &str,
        display_name: Option<&str>,
        starting_balance: Amount,
    ) -> Result<Player> {
        let conn = self.storage.get_connection().await;

        if let Some(player) = query_player(&conn, key)? {
            return Ok(player);
        }

        conn.execute(
            "INSERT INTO players (key, display_name, balance_cents, messages_count, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![
                key,
                display_name.unwrap_or(DEFAULT_DISPLAY_NAME),
                starting_balance.to_cents(),
                Utc::now().timestamp(),
            ],
        )?;

        query_player(&conn, key)?
            .ok_or_else(|| rusqlite::Error::QueryReturnedNoRows.into())
    }

    pub async fn get(&self, key: &str) -> Result<Option<Player>> {
        let conn = self.storage.get_connection().await;
        query_player(&conn, key)
    }

    /// Unconditional relative debit; the caller pre-checks funds.
    pub async fn debit(&self, key: &str, amount: Amount) -> Result<Amount> {
        let conn = self.storage.get_connection().await;
        apply_debit(&conn, key, amount)
    }

    pub async fn credit(&self, key: &str, amount: Amount) -> Result<Amount> {
        let conn = self.storage.get_connection().await;
        apply_credit(&conn, key, amount)
    }

    /// Administrative top-up back to the starting balance.
    pub async fn reset_balance(&self, key: &str, starting_balance: Amount) -> Result<Amount> {
        let conn = self.storage.get_connection().await;

        let updated = conn.execute(
            "UPDATE players SET balance_cents = ?1 WHERE key = ?2",
            params![starting_balance.to_cents(), key],
        )?;
        if updated == 0 {
            return Err(rusqlite::Error::QueryReturnedNoRows.into());
        }

        Ok(starting_balance)
    }

    /// All players in insertion order, for turn ordering and display.
    pub async fn list_all(&self) -> Result<Vec<Player>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT key, display_name, balance_cents, messages_count, created_at
             FROM players ORDER BY created_at ASC, rowid ASC",
        )?;

        let player_iter = stmt.query_map([], row_to_player)?;

        let mut players = Vec::new();
        for player in player_iter {
            players.push(player?);
        }

        Ok(players)
    }
}

fn row_to_player(row: &rusqlite::Row<'_>) -> rusqlite::Result<Player> {
    Ok(Player {
        key: row.get(0)?,
        display_name: row.get(1)?,
        balance: Amount::from_cents(row.get(2)?),
        messages_count: row.get::<_, i64>(3)? as u64,
        created_at: chrono::DateTime::from_timestamp(row.get(4)?, 0)
            .unwrap_or_else(Utc::now),
    })
}

fn query_player(conn: &Connection, key: &str) -> Result<Option<Player>> {
    let player = conn
        .query_row(
            "SELECT key, display_name, balance_cents, messages_count, created_at
             FROM players WHERE key = ?1",
            params![key],
            row_to_player,
        )
        .optional()?;
    Ok(player)
}

/// Relative decrement plus message-count bump, composable inside the
/// engine's settle transaction.
pub(crate) fn apply_debit(conn: &Connection, key: &str, amount: Amount) -> Result<Amount> {
    let updated = conn.execute(
        "UPDATE players
         SET balance_cents = balance_cents - ?1, messages_count = messages_count + 1
         WHERE key = ?2",
        params![amount.to_cents(), key],
    )?;
    if updated == 0 {
        return Err(rusqlite::Error::QueryReturnedNoRows.into());
    }

    current_balance(conn, key)
}

pub(crate) fn apply_credit(conn: &Connection, key: &str, amount: Amount) -> Result<Amount> {
    let updated = conn.execute(
        "UPDATE players SET balance_cents = balance_cents + ?1 WHERE key = ?2",
        params![amount.to_cents(), key],
    )?;
    if updated == 0 {
        return Err(rusqlite::Error::QueryReturnedNoRows.into());
    }

    current_balance(conn, key)
}

pub(crate) fn current_balance(conn: &Connection, key: &str) -> Result<Amount> {
    let cents: i64 = conn.query_row(
        "SELECT balance_cents FROM players WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )?;
    Ok(Amount::from_cents(cents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn open_storage() -> (Storage, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let storage = Storage::new(&dir.path().join("test.db"), Amount::from_cents(100_000))
            .await
            .unwrap();
        (storage, dir)
    }

    #[tokio::test]
    async fn credit_and_debit_are_relative_updates() {
        let (storage, _dir) = open_storage().await;
        let store = PlayerStore::new(&storage);
        store
            .get_or_create("k1", Some("Marco"), Amount::from_cents(1_000))
            .await
            .unwrap();

        let after_credit = store.credit("k1", Amount::from_cents(500)).await.unwrap();
        assert_eq!(after_credit, Amount::from_cents(1_500));

        let after_debit = store.debit("k1", Amount::from_cents(30)).await.unwrap();
        assert_eq!(after_debit, Amount::from_cents(1_470));

        // Debit counts the message, credit does not
        let player = store.get("k1").await.unwrap().unwrap();
        assert_eq!(player.messages_count, 1);
    }

    #[tokio::test]
    async fn debit_unknown_player_is_a_storage_error() {
        let (storage, _dir) = open_storage().await;
        let store = PlayerStore::new(&storage);

        assert!(store.debit("ghost", Amount::from_cents(30)).await.is_err());
        assert!(store.credit("ghost", Amount::from_cents(30)).await.is_err());
    }

    #[tokio::test]
    async fn reset_balance_overwrites_to_starting_amount() {
        let (storage, _dir) = open_storage().await;
        let store = PlayerStore::new(&storage);
        store
            .get_or_create("k1", None, Amount::from_cents(1_000))
            .await
            .unwrap();
        store.debit("k1", Amount::from_cents(600)).await.unwrap();

        let restored = store
            .reset_balance("k1", Amount::from_cents(1_000))
            .await
            .unwrap();
        assert_eq!(restored, Amount::from_cents(1_000));
        assert_eq!(
            store.get("k1").await.unwrap().unwrap().balance,
            Amount::from_cents(1_000)
        );
    }

    #[tokio::test]
    async fn list_all_preserves_insertion_order() {
        let (storage, _dir) = open_storage().await;
        let store = PlayerStore::new(&storage);
        for key in ["a", "b", "c"] {
            store
                .get_or_create(key, Some(key), Amount::from_cents(1_000))
                .await
                .unwrap();
        }

        let players = store.list_all().await.unwrap();
        let keys: Vec<&str> = players.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn missing_display_name_falls_back_to_default() {
        let (storage, _dir) = open_storage().await;
        let store = PlayerStore::new(&storage);
        let player = store
            .get_or_create("k1", None, Amount::from_cents(1_000))
            .await
            .unwrap();
        assert_eq!(player.display_name, DEFAULT_DISPLAY_NAME);
    }
}
