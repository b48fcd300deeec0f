/*!
 * Database connection management.
 *
 * A single SQLite connection guarded by a mutex. Every write goes through it,
 * which serializes concurrent memory inserts from batch workers; async callers
 * run their closures on tokio's blocking pool.
 */

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::schema;

const DEFAULT_DB_FILENAME: &str = "memory.db";
const DEFAULT_DB_DIRNAME: &str = "gamestringer";

/// How long a statement waits on a lock held by another process
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const IN_MEMORY_PATH: &str = ":memory:";

/// Shared handle to the memory database
#[derive(Clone)]
pub struct DatabaseConnection {
    db_path: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl fmt::Debug for DatabaseConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConnection").field("db_path", &self.db_path).finish()
    }
}

/// Apply connection pragmas and bring the schema up to date
fn prepare(conn: &Connection, on_disk: bool) -> Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT).context("Failed to set busy timeout")?;
    if on_disk {
        // WAL keeps `memory stats` readable while a batch writes results
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .context("Failed to enable WAL journal")?;
    }
    schema::initialize_schema(conn)
}

impl DatabaseConnection {
    /// Open the memory database under the user's data directory
    pub fn new_default() -> Result<Self> {
        Self::new(Self::default_database_path()?)
    }

    /// Open (or create) the memory database at `db_path`
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {}", parent.display()))?;
        }

        info!("Opening translation memory at {}", db_path.display());
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
        prepare(&conn, true)?;

        Ok(Self::wrap(db_path, conn))
    }

    /// Throwaway database that lives as long as the handle
    pub fn new_in_memory() -> Result<Self> {
        debug!("Creating in-memory database");
        let conn = Connection::open_in_memory().context("Failed to create in-memory database")?;
        prepare(&conn, false)?;

        Ok(Self::wrap(PathBuf::from(IN_MEMORY_PATH), conn))
    }

    fn wrap(db_path: PathBuf, conn: Connection) -> Self {
        Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        }
    }

    /// `<data dir>/gamestringer/memory.db`
    pub fn default_database_path() -> Result<PathBuf> {
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
            .ok_or_else(|| anyhow!("Could not determine a data directory for the translation memory"))?;

        Ok(base_dir.join(DEFAULT_DB_DIRNAME).join(DEFAULT_DB_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn is_in_memory(&self) -> bool {
        self.db_path.as_os_str() == IN_MEMORY_PATH
    }

    /// Run `f` on the calling thread while holding the connection
    pub fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        f(&self.connection.lock())
    }

    /// Run `f` on the blocking pool while holding the connection
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || f(&connection.lock()))
            .await
            .context("Database task panicked")?
    }

    /// Like `execute_async`, inside a transaction that commits only when `f` succeeds
    pub async fn transaction_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let mut conn = connection.lock();
            let tx = conn.transaction().context("Failed to begin transaction")?;
            let value = f(&tx)?;
            tx.commit().context("Failed to commit transaction")?;
            Ok(value)
        })
        .await
        .context("Database task panicked")?
    }

    /// Row counts and on-disk size
    pub fn stats(&self) -> Result<DatabaseStats> {
        let (memory_entries, snapshot_count) = self.execute(|conn| {
            let count = |table: &str| -> Result<i64> {
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                    .with_context(|| format!("Failed to count rows in {}", table))
            };
            Ok((count("translation_memory")?, count("batch_snapshots")?))
        })?;

        let file_size_bytes = if self.is_in_memory() {
            0
        } else {
            std::fs::metadata(&self.db_path).map(|meta| meta.len()).unwrap_or(0)
        };

        Ok(DatabaseStats {
            memory_entries,
            snapshot_count,
            file_size_bytes,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub memory_entries: i64,
    pub snapshot_count: i64,
    /// Size of the main database file; the WAL file is not included
    pub file_size_bytes: u64,
}

impl fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Database: {} memory rows, {} snapshots, {} KB on disk",
            self.memory_entries,
            self.snapshot_count,
            self.file_size_bytes / 1024
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newInMemory_shouldCreateValidConnection() {
        let db = DatabaseConnection::new_in_memory().expect("Failed to create in-memory DB");
        assert!(db.is_in_memory());
    }

    #[test]
    fn test_new_onDisk_shouldUseWalJournal() {
        let dir = tempfile::tempdir().unwrap();
        let db = DatabaseConnection::new(dir.path().join("memory.db")).unwrap();

        let mode: String = db
            .execute(|conn| Ok(conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_new_withTempPath_shouldCreateParentDirectories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("memory.db");

        let db = DatabaseConnection::new(&path).expect("Failed to create DB");

        assert!(path.exists());
        assert_eq!(db.stats().unwrap().memory_entries, 0);
    }

    #[test]
    fn test_stats_shouldReturnValidStats() {
        let db = DatabaseConnection::new_in_memory().expect("Failed to create DB");

        let stats = db.stats().expect("Failed to get stats");

        assert_eq!(stats.memory_entries, 0);
        assert_eq!(stats.snapshot_count, 0);
        assert_eq!(stats.file_size_bytes, 0);
    }

    #[tokio::test]
    async fn test_executeAsync_shouldRunInBlockingContext() {
        let db = DatabaseConnection::new_in_memory().expect("Failed to create DB");

        let result = db
            .execute_async(|conn| {
                let count: i64 = conn.query_row("SELECT 42", [], |row| row.get(0))?;
                Ok(count)
            })
            .await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_transactionAsync_withError_shouldRollBack() {
        let db = DatabaseConnection::new_in_memory().expect("Failed to create DB");

        let result: Result<()> = db
            .transaction_async(|tx| {
                tx.execute(
                    "INSERT INTO batch_snapshots (id, job_id, source_language, target_language, provider, completed, total, payload, created_at)
                     VALUES ('s1', 'j1', 'en', 'it', 'openai', 0, 1, '{}', datetime('now'))",
                    [],
                )?;
                Err(anyhow::anyhow!("abort"))
            })
            .await;
        assert!(result.is_err());

        let count: i64 = db
            .execute_async(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM batch_snapshots", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
