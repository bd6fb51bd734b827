//! Seen-slot store: the dedup oracle of the discovery loop.
//!
//! A record `{slot key, first seen at}` is created once and never updated.
//! Records older than the retention window are dropped by [`SeenSlots::prune`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use slotwatch_booking::BoxFuture;
use slotwatch_core::SlotKey;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{ServerError, ServerResult};

/// How long a writer waits for another process holding the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "\
    PRAGMA journal_mode = WAL;
    CREATE TABLE IF NOT EXISTS seen_slots (
        slot_key TEXT PRIMARY KEY NOT NULL,
        first_seen INTEGER NOT NULL
    );";

/// Set membership over slot keys, with TTL pruning.
pub trait SeenSlots: Send + Sync {
    /// True if the key was recorded before.
    fn seen<'a>(&'a self, key: &'a SlotKey) -> BoxFuture<'a, ServerResult<bool>>;

    /// Records the key. Marking an already-seen key is a no-op.
    fn mark_seen<'a>(&'a self, key: &'a SlotKey) -> BoxFuture<'a, ServerResult<()>>;

    /// Drops records first seen more than `older_than` ago; returns how many.
    fn prune(&self, older_than: Duration) -> BoxFuture<'_, ServerResult<usize>>;
}

fn cutoff(older_than: Duration) -> ServerResult<DateTime<Utc>> {
    let out_of_range = || ServerError::config(format!("retention out of range: {:?}", older_than));
    let delta = TimeDelta::from_std(older_than).map_err(|_| out_of_range())?;
    Utc::now().checked_sub_signed(delta).ok_or_else(out_of_range)
}

/// In-memory store, for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemorySeenStore {
    records: Mutex<BTreeMap<SlotKey, DateTime<Utc>>>,
}

impl MemorySeenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a key with an explicit first-seen time.
    pub async fn mark_seen_at(&self, key: SlotKey, at: DateTime<Utc>) {
        self.records.lock().await.entry(key).or_insert(at);
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// True if no record is held.
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

impl SeenSlots for MemorySeenStore {
    fn seen<'a>(&'a self, key: &'a SlotKey) -> BoxFuture<'a, ServerResult<bool>> {
        Box::pin(async move { Ok(self.records.lock().await.contains_key(key)) })
    }

    fn mark_seen<'a>(&'a self, key: &'a SlotKey) -> BoxFuture<'a, ServerResult<()>> {
        Box::pin(async move {
            self.mark_seen_at(key.clone(), Utc::now()).await;
            Ok(())
        })
    }

    fn prune(&self, older_than: Duration) -> BoxFuture<'_, ServerResult<usize>> {
        Box::pin(async move {
            let cutoff = cutoff(older_than)?;
            let mut records = self.records.lock().await;
            let before = records.len();
            records.retain(|_, first_seen| *first_seen >= cutoff);
            Ok(before - records.len())
        })
    }
}

fn map_db_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> ServerError {
    ServerError::store(e.to_string())
}

/// Store persisted in a SQLite database.
///
/// Every operation is a single statement, so several processes (the poller
/// and `slotwatch prune`, say) can share one file without losing records.
pub struct SqliteSeenStore {
    path: PathBuf,
    conn: tokio_rusqlite::Connection,
}

impl SqliteSeenStore {
    /// Opens the database, creating the file and table if needed.
    pub async fn open(path: impl Into<PathBuf>) -> ServerResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let conn = tokio_rusqlite::Connection::open(&path)
            .await
            .map_err(|e| ServerError::store(format!("{}: {e}", path.display())))?;
        conn.call(|conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            conn.execute_batch(SCHEMA)?;
            Ok::<_, rusqlite::Error>(())
        })
        .await
        .map_err(|e| ServerError::store(format!("{}: {e}", path.display())))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&path, fs::Permissions::from_mode(0o600));
        }

        debug!(path = %path.display(), "opened seen-slot store");
        Ok(Self { path, conn })
    }

    /// Returns the path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records a key with an explicit first-seen time.
    pub async fn mark_seen_at(&self, key: SlotKey, at: DateTime<Utc>) -> ServerResult<()> {
        let first_seen = at.timestamp();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO seen_slots (slot_key, first_seen) VALUES (?1, ?2)",
                    rusqlite::params![key.as_str(), first_seen],
                )?;
                Ok::<_, rusqlite::Error>(())
            })
            .await
            .map_err(map_db_err)
    }

    /// Number of records held.
    pub async fn len(&self) -> ServerResult<usize> {
        self.conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM seen_slots", [], |row| row.get(0))?;
                Ok::<_, rusqlite::Error>(count as usize)
            })
            .await
            .map_err(map_db_err)
    }
}

impl SeenSlots for SqliteSeenStore {
    fn seen<'a>(&'a self, key: &'a SlotKey) -> BoxFuture<'a, ServerResult<bool>> {
        let key = key.as_str().to_owned();
        Box::pin(async move {
            self.conn
                .call(move |conn| {
                    let seen: bool = conn.query_row(
                        "SELECT EXISTS(SELECT 1 FROM seen_slots WHERE slot_key = ?1)",
                        rusqlite::params![key],
                        |row| row.get(0),
                    )?;
                    Ok::<_, rusqlite::Error>(seen)
                })
                .await
                .map_err(map_db_err)
        })
    }

    fn mark_seen<'a>(&'a self, key: &'a SlotKey) -> BoxFuture<'a, ServerResult<()>> {
        Box::pin(self.mark_seen_at(key.clone(), Utc::now()))
    }

    fn prune(&self, older_than: Duration) -> BoxFuture<'_, ServerResult<usize>> {
        Box::pin(async move {
            let cutoff = cutoff(older_than)?.timestamp();
            let removed = self
                .conn
                .call(move |conn| {
                    conn.execute(
                        "DELETE FROM seen_slots WHERE first_seen < ?1",
                        rusqlite::params![cutoff],
                    )
                })
                .await
                .map_err(map_db_err)?;
            if removed > 0 {
                info!(removed, "pruned seen-slot records");
            }
            Ok(removed)
        })
    }
}
