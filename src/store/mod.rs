//! SQLite persistence for packages, installations and cached releases
//!
//! A single [`Store`] is opened by the entry point and shared through `Arc`
//! with every component that needs storage.
//!
//! # Modules
//!
//! - [`installations`]: Installation recorder and usage aggregation
//! - [`releases`]: Release cache backing the resolver
//! - [`error`]: Storage error type

pub mod error;
pub mod installations;
pub mod releases;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction};
use tracing::{debug, info};

pub use error::StoreError;
pub use installations::PackageUsage;

/// How long SQLite waits on a locked database before reporting busy
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn new(db_path: &Path) -> Result<Self, StoreError> {
        Self::with_busy_timeout(db_path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open the database, waiting at most `busy_timeout` for another writer per statement
    pub fn with_busy_timeout(db_path: &Path, busy_timeout: Duration) -> Result<Self, StoreError> {
        info!("Opening database at {:?}", db_path);

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(busy_timeout)?;

        debug!("Database connection established");

        let store = Self {
            conn: Mutex::new(conn),
        };

        store.create_schema()?;
        info!("Database initialized successfully");

        Ok(store)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        debug!("Creating database schema");

        let conn = self.lock_conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS packages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                package_name TEXT NOT NULL UNIQUE,
                package_version TEXT,
                upload_time INTEGER,
                releases_updated_at INTEGER,
                fetching_since INTEGER
            );

            CREATE TABLE IF NOT EXISTS installations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                package_id INTEGER NOT NULL,
                package_version TEXT NOT NULL,
                platform TEXT NOT NULL,
                python_version TEXT NOT NULL,
                ip TEXT NOT NULL,
                created_on TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                count INTEGER NOT NULL DEFAULT 1,
                FOREIGN KEY (package_id) REFERENCES packages(id),
                UNIQUE(package_id, package_version, platform, python_version, ip, created_on)
            );

            CREATE INDEX IF NOT EXISTS idx_installations_created_at
                ON installations(created_at);

            CREATE TABLE IF NOT EXISTS releases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                package_id INTEGER NOT NULL,
                version TEXT NOT NULL,
                upload_time INTEGER NOT NULL,
                FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE,
                UNIQUE(package_id, version)
            );

            CREATE INDEX IF NOT EXISTS idx_releases_package_id ON releases(package_id);
            "#,
        )?;

        debug!("Database schema created successfully");
        Ok(())
    }

    /// Insert the package row if missing and return its id
    fn ensure_package(tx: &Transaction<'_>, package_name: &str) -> Result<i64, StoreError> {
        tx.execute(
            "INSERT INTO packages (package_name) VALUES (?1) ON CONFLICT(package_name) DO NOTHING",
            [package_name],
        )?;

        let package_id = tx.query_row(
            "SELECT id FROM packages WHERE package_name = ?1",
            [package_name],
            |row| row.get(0),
        )?;

        Ok(package_id)
    }
}

fn to_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

/// Convert a stored millisecond timestamp read from `column`
fn from_millis(column: usize, ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(column, ms))
}
