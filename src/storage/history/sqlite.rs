//! `SQLite` history store.
//!
//! Each user's history is one JSON document in `news_history`, next to the
//! integer version used for conditional writes. The connection sits behind a
//! mutex and every call runs on the blocking pool.

use crate::models::{UserHistory, UserId};
use crate::storage::traits::{HistoryStore, WriteOutcome};
use crate::{Error, Result};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

const CREATE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS news_history (
    user_id    TEXT PRIMARY KEY NOT NULL,
    version    INTEGER NOT NULL,
    document   TEXT NOT NULL,
    updated_at INTEGER NOT NULL
)";

/// Acquires a mutex, recovering from poison.
fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("newsroom_sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Applies WAL journaling, NORMAL sync and a 5 second busy timeout.
fn configure_connection(conn: &Connection) {
    // journal_mode returns a row, so pragma_update results are ignored
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    let _ = conn.pragma_update(None, "busy_timeout", "5000");
}

/// History store persisted to a `SQLite` database file.
#[derive(Debug, Clone)]
pub struct SqliteHistoryStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteHistoryStore {
    /// Opens (or creates) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreWriteFailure`] if the file cannot be opened or the
    /// schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::store("open", e))?;
        }
        let conn = Connection::open(path).map_err(|e| Error::store("open", e))?;
        Self::initialize(conn, Some(path.to_path_buf()))
    }

    /// Creates a store backed by a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreWriteFailure`] if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::store("open", e))?;
        Self::initialize(conn, None)
    }

    /// Returns the database path, if file-backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn initialize(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        configure_connection(&conn);
        conn.execute(CREATE_TABLE, [])
            .map_err(|e| Error::store("create_table", e))?;
        tracing::debug!(path = ?path, "opened sqlite history store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// Runs `op` against the connection on the blocking pool.
    async fn with_connection<T, F>(&self, operation: &'static str, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = acquire_lock(&conn);
            op(&guard)
        })
        .await
        .map_err(|e| Error::store(operation, e))?
    }
}

fn find_blocking(conn: &Connection, user_id: &str) -> Result<Option<UserHistory>> {
    let document: Option<String> = conn
        .query_row(
            "SELECT document FROM news_history WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| Error::store("find_one", e))?;

    document
        .map(|json| serde_json::from_str(&json).map_err(|e| Error::store("decode_history", e)))
        .transpose()
}

fn upsert_blocking(
    conn: &Connection,
    history: &UserHistory,
    expected_version: Option<u64>,
) -> Result<WriteOutcome> {
    let document = serde_json::to_string(history).map_err(|e| Error::store("encode_history", e))?;
    let version = to_sql_version(history.version)?;
    let updated_at = i64::try_from(history.updated_at).unwrap_or(i64::MAX);

    let changed = match expected_version {
        None => conn.execute(
            "INSERT INTO news_history (user_id, version, document, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO NOTHING",
            params![history.user_id.as_str(), version, document, updated_at],
        ),
        Some(expected) => conn.execute(
            "UPDATE news_history
             SET version = ?2, document = ?3, updated_at = ?4
             WHERE user_id = ?1 AND version = ?5",
            params![
                history.user_id.as_str(),
                version,
                document,
                updated_at,
                to_sql_version(expected)?
            ],
        ),
    }
    .map_err(|e| Error::store("upsert", e))?;

    Ok(if changed == 1 {
        WriteOutcome::Written
    } else {
        WriteOutcome::Conflict
    })
}

fn to_sql_version(version: u64) -> Result<i64> {
    i64::try_from(version).map_err(|e| Error::store("upsert", e))
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn find_one(&self, user_id: &UserId) -> Result<Option<UserHistory>> {
        let user_id = user_id.as_str().to_string();
        self.with_connection("find_one", move |conn| find_blocking(conn, &user_id))
            .await
    }

    async fn upsert(
        &self,
        history: &UserHistory,
        expected_version: Option<u64>,
    ) -> Result<WriteOutcome> {
        let history = history.clone();
        self.with_connection("upsert", move |conn| {
            upsert_blocking(conn, &history, expected_version)
        })
        .await
    }
}
