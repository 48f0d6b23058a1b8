pub mod contacts;
pub mod error;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod password;
pub mod users;

pub use error::{StoreError, StoreResult};
pub use models::UserUpdate;

use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

const READER_POOL_SIZE: usize = 4;

/// SQLite store with a reader/writer split.
///
/// The writer mutex is the process-wide write guard: every mutation holds it
/// across its existence checks, writes and commit. Readers are read-only WAL
/// connections and never wait on it.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
}

impl Database {
    pub fn open(path: &Path) -> StoreResult<Self> {
        let writer = Connection::open(path)?;

        // WAL mode for concurrent reads
        writer.pragma_update(None, "journal_mode", "WAL")?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        writer.busy_timeout(Duration::from_secs(5))?;

        migrations::run(&writer)?;

        let mut readers = Vec::with_capacity(READER_POOL_SIZE);
        for _ in 0..READER_POOL_SIZE {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.busy_timeout(Duration::from_secs(5))?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Database opened at {} (1 writer + {} readers)",
            path.display(),
            READER_POOL_SIZE
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
        })
    }

    /// Private in-memory database. Reads go through the writer connection.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;

        Ok(Self {
            writer: Mutex::new(conn),
            readers: Vec::new(),
            reader_idx: AtomicUsize::new(0),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        if self.readers.is_empty() {
            return self.with_conn_mut(f);
        }

        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx]
            .lock()
            .map_err(|e| StoreError::Poisoned(format!("reader: {}", e)))?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self
            .writer
            .lock()
            .map_err(|e| StoreError::Poisoned(format!("writer: {}", e)))?;
        f(&conn)
    }
}
