//! SQLite backed transfer history

use log::error;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::path::Path;
use std::sync::Mutex;

use crate::host::TransferHistory;
use crate::models::{MediaType, TransferRecord};

/// Transfer history store
pub struct SqliteTransferHistory {
    conn: Mutex<Connection>,
}

impl SqliteTransferHistory {
    /// Open or create database
    pub fn open(path: &Path) -> SqliteResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    pub fn open_memory() -> SqliteResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> SqliteResult<T>) -> SqliteResult<T> {
        // A panic while holding the lock leaves the connection itself usable
        let conn = self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&conn)
    }

    /// Initialize database schema
    fn init_schema(&self) -> SqliteResult<()> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS transfer_history (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    src TEXT NOT NULL,
                    dest TEXT NOT NULL,
                    mtype TEXT NOT NULL,
                    title TEXT NOT NULL,
                    year INTEGER,
                    tmdbid INTEGER NOT NULL,
                    date TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_transfer_history_tmdbid ON transfer_history(tmdbid, mtype);
                ",
            )
        })
    }

    /// Record a transfer
    pub fn record(&self, record: &TransferRecord) -> SqliteResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO transfer_history (src, dest, mtype, title, year, tmdbid, date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.src,
                    record.dest,
                    record.mtype,
                    record.title,
                    record.year,
                    record.tmdbid as i64,
                    record.date,
                ],
            )?;
            Ok(())
        })
    }

    /// Most recent transfer for an identifier and media type value
    pub fn find_latest(&self, tmdbid: u64, mtype: &str) -> SqliteResult<Option<TransferRecord>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT src, dest, mtype, title, year, tmdbid, date FROM transfer_history
                 WHERE tmdbid = ?1 AND mtype = ?2 ORDER BY date DESC, id DESC LIMIT 1",
                params![tmdbid as i64, mtype],
                |row| {
                    Ok(TransferRecord {
                        src: row.get(0)?,
                        dest: row.get(1)?,
                        mtype: row.get(2)?,
                        title: row.get(3)?,
                        year: row.get(4)?,
                        tmdbid: row.get::<_, i64>(5)? as u64,
                        date: row.get(6)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Get record count
    pub fn record_count(&self) -> SqliteResult<u64> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM transfer_history", [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }
}

impl TransferHistory for SqliteTransferHistory {
    fn get_by_type_tmdbid(&self, tmdbid: u64, media_type: MediaType) -> Option<TransferRecord> {
        match self.find_latest(tmdbid, media_type.as_str()) {
            Ok(record) => record,
            Err(e) => {
                error!("Failed to query transfer history: {}", e);
                None
            }
        }
    }
}
