//! SQLite-backed CoordinationStore implementation.
//! Lets candidates in separate processes on one host elect a leader
//! through a shared database file.
//!
//! Enable with the `sqlite` feature flag:
//! ```toml
//! baton-core = { path = "../baton-core", features = ["sqlite"] }
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::error::StoreError;
use crate::infrastructure::CoordinationStore;
use crate::types::now_ms;

/// A coordination store backed by a SQLite file.
///
/// Expiry is wall-clock based (`expires_at` in Unix ms), so every process
/// sharing the file must have a reasonably synchronized clock. Each
/// candidate should open its own `SqliteStore`.
///
/// Statements run on tokio's blocking pool. A call stuck behind another
/// process's write lock can therefore be abandoned by its caller; the
/// statement itself finishes in the background once the busy timeout
/// elapses.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at the given path.
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;

        // WAL lets readers proceed while a candidate holds the write lock
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS leases (
                key        TEXT PRIMARY KEY,
                holder     TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, rusqlite::Error> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let out = tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))??;
        Ok(out)
    }
}

/// Current time and the matching expiry, clamped to SQLite's INTEGER range.
fn stamps(ttl: Duration) -> (i64, i64) {
    let now = i64::try_from(now_ms()).unwrap_or(i64::MAX);
    let ttl = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    (now, now.saturating_add(ttl))
}

#[async_trait]
impl CoordinationStore for SqliteStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let (key, value) = (key.to_owned(), value.to_owned());
        self.blocking(move |conn| {
            let (now, expires_at) = stamps(ttl);
            // IMMEDIATE takes the write lock up front so the purge and the
            // insert are not interleaved with another process doing the same.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "DELETE FROM leases WHERE key = ?1 AND expires_at <= ?2",
                params![key, now],
            )?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO leases (key, holder, expires_at) VALUES (?1, ?2, ?3)",
                params![key, value, expires_at],
            )?;
            tx.commit()?;
            Ok(inserted == 1)
        })
        .await
    }

    async fn refresh_ttl(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let key = key.to_owned();
        self.blocking(move |conn| {
            let (now, expires_at) = stamps(ttl);
            let rows = conn.execute(
                "UPDATE leases SET expires_at = ?1 WHERE key = ?2 AND expires_at > ?3",
                params![expires_at, key, now],
            )?;
            Ok(rows > 0)
        })
        .await
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_owned();
        self.blocking(move |conn| {
            let (now, _) = stamps(Duration::ZERO);
            conn.query_row(
                "SELECT holder FROM leases WHERE key = ?1 AND expires_at > ?2",
                params![key, now],
                |row| row.get::<_, String>(0),
            )
            .optional()
        })
        .await
    }

    async fn refresh_if_holder(
        &self,
        key: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let (key, holder) = (key.to_owned(), holder.to_owned());
        self.blocking(move |conn| {
            let (now, expires_at) = stamps(ttl);
            let rows = conn.execute(
                "UPDATE leases SET expires_at = ?1
                 WHERE key = ?2 AND holder = ?3 AND expires_at > ?4",
                params![expires_at, key, holder, now],
            )?;
            Ok(rows > 0)
        })
        .await
    }
}
