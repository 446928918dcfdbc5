use crate::error::Result;
use crate::storage::{player_store, Storage};
use crate::types::{Amount, PoolState};
use chrono::Utc;
use rusqlite::{params, Connection};

/// The singleton pool row (id = 1): jackpot, turn holder, round
/// counter. Mutations are serialized by the storage mutex; the engine
/// wraps the settle-phase combinations in one SQLite transaction so a
/// payout can never interleave with a concurrent increment.
pub struct PoolStore<'a> {
    storage: &'a Storage,
}

impl<'a> PoolStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn read(&self) -> Result<PoolState> {
        let conn = self.storage.get_connection().await;
        query_pool(&conn)
    }

    /// Sets the turn holder only if no one holds it yet. Used at
    /// registration time; does not count a round.
    pub async fn seed_turn(&self, key: &str) -> Result<()> {
        let conn = self.storage.get_connection().await;

        conn.execute(
            "UPDATE pool_state
             SET current_turn_key = ?1, updated_at = ?2
             WHERE id = 1 AND current_turn_key IS NULL",
            params![key, Utc::now().timestamp()],
        )?;

        Ok(())
    }

    pub async fn advance_turn(&self, key: &str) -> Result<()> {
        let conn = self.storage.get_connection().await;
        apply_advance_turn(&conn, key)
    }

    pub async fn increment_jackpot(&self, amount: Amount) -> Result<()> {
        let conn = self.storage.get_connection().await;
        apply_increment_jackpot(&conn, amount)
    }
}

pub(crate) fn query_pool(conn: &Connection) -> Result<PoolState> {
    let state = conn.query_row(
        "SELECT jackpot_cents, current_turn_key, total_rounds, updated_at
         FROM pool_state WHERE id = 1",
        [],
        |row| {
            Ok(PoolState {
                jackpot: Amount::from_cents(row.get(0)?),
                current_turn_key: row.get(1)?,
                total_rounds: row.get::<_, i64>(2)? as u64,
                updated_at: row
                    .get::<_, Option<i64>>(3)?
                    .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)),
            })
        },
    )?;
    Ok(state)
}

pub(crate) fn apply_advance_turn(conn: &Connection, key: &str) -> Result<()> {
    conn.execute(
        "UPDATE pool_state
         SET current_turn_key = ?1, total_rounds = total_rounds + 1, updated_at = ?2
         WHERE id = 1",
        params![key, Utc::now().timestamp()],
    )?;
    Ok(())
}

pub(crate) fn apply_increment_jackpot(conn: &Connection, amount: Amount) -> Result<()> {
    conn.execute(
        "UPDATE pool_state SET jackpot_cents = jackpot_cents + ?1 WHERE id = 1",
        params![amount.to_cents()],
    )?;
    Ok(())
}

/// Reads the jackpot, credits it to the winner and writes the seed
/// back, all on the same connection. Callers run this inside a
/// transaction together with the log append and turn advance.
pub(crate) fn apply_payout_and_reset(
    conn: &Connection,
    winner_key: &str,
    seed: Amount,
) -> Result<Amount> {
    let jackpot: i64 = conn.query_row(
        "SELECT jackpot_cents FROM pool_state WHERE id = 1",
        [],
        |row| row.get(0),
    )?;
    let paid = Amount::from_cents(jackpot);

    player_store::apply_credit(conn, winner_key, paid)?;

    conn.execute(
        "UPDATE pool_state SET jackpot_cents = ?1 WHERE id = 1",
        params![seed.to_cents()],
    )?;

    Ok(paid)
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
    async fn pool_initializes_from_the_seed() {
        let (storage, _dir) = open_storage().await;
        let pool = PoolStore::new(&storage).read().await.unwrap();

        assert_eq!(pool.jackpot, Amount::from_cents(100_000));
        assert_eq!(pool.total_rounds, 0);
        assert!(pool.current_turn_key.is_none());
    }

    #[tokio::test]
    async fn seed_turn_only_claims_an_empty_slot() {
        let (storage, _dir) = open_storage().await;
        let store = PoolStore::new(&storage);

        store.seed_turn("first").await.unwrap();
        store.seed_turn("second").await.unwrap();

        let pool = store.read().await.unwrap();
        assert_eq!(pool.current_turn_key.as_deref(), Some("first"));
        // Seeding never counts a round
        assert_eq!(pool.total_rounds, 0);
    }

    #[tokio::test]
    async fn advance_turn_sets_holder_and_counts_rounds() {
        let (storage, _dir) = open_storage().await;
        let store = PoolStore::new(&storage);

        store.advance_turn("a").await.unwrap();
        store.advance_turn("b").await.unwrap();

        let pool = store.read().await.unwrap();
        assert_eq!(pool.current_turn_key.as_deref(), Some("b"));
        assert_eq!(pool.total_rounds, 2);
        assert!(pool.updated_at.is_some());
    }

    #[tokio::test]
    async fn increment_jackpot_accumulates() {
        let (storage, _dir) = open_storage().await;
        let store = PoolStore::new(&storage);

        store.increment_jackpot(Amount::from_cents(27)).await.unwrap();
        store.increment_jackpot(Amount::from_cents(27)).await.unwrap();

        let pool = store.read().await.unwrap();
        assert_eq!(pool.jackpot, Amount::from_cents(100_054));
    }
}
