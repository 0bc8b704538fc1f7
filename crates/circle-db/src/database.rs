//! Connection ownership, pragmas and transactions.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, Transaction};
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;

/// Path value that selects an in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// The application database. A single SQLite connection guarded by a mutex;
/// every query runs through [`Database::with_conn`] or [`Database::with_tx`].
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database file and run pending migrations.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        if path.as_os_str() == IN_MEMORY {
            return Self::open_in_memory();
        }
        let conn = Connection::open(path)?;
        apply_pragmas(&conn, true)?;
        info!(path = %path.display(), "Opened database");
        Self::initialize(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        apply_pragmas(&conn, false)?;
        Self::initialize(conn)
    }

    fn initialize(mut conn: Connection) -> DbResult<Self> {
        migrations::run_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run read or single-statement work on the connection.
    pub fn with_conn<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let conn = self.conn.lock().map_err(|_| DbError::Poisoned)?;
        f(&conn)
    }

    /// Run `f` inside a transaction. Commits on `Ok`, rolls back on `Err`.
    pub fn with_tx<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut conn = self.conn.lock().map_err(|_| DbError::Poisoned)?;
        let tx = conn.transaction().map_err(DbError::from)?;
        let out = f(&tx)?;
        tx.commit().map_err(DbError::from)?;
        Ok(out)
    }

    /// Cheap round-trip used by the readiness probe.
    pub fn ping(&self) -> DbResult<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }
}

/// Apply connection pragmas. WAL only makes sense for file-backed databases.
fn apply_pragmas(conn: &Connection, file_backed: bool) -> DbResult<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        ",
    )?;
    if file_backed {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory_and_ping() {
        let db = Database::open_in_memory().unwrap();
        db.ping().unwrap();
    }

    #[test]
    fn test_open_file_twice_reuses_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("circle.db");
        {
            let db = Database::open(&path).unwrap();
            db.ping().unwrap();
        }
        let db = Database::open(&path).unwrap();
        db.ping().unwrap();
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        let result: DbResult<()> = db.with_tx(|tx| {
            tx.execute(
                "INSERT INTO users (email, username, password_hash, created_at)
                 VALUES ('a@example.com', 'a', 'x', '2024-01-01T00:00:00Z')",
                [],
            )?;
            Err(DbError::not_found("forced"))
        });
        assert!(result.is_err());

        let count: i64 = db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
                    .map_err(DbError::from)
            })
            .unwrap();
        assert_eq!(count, 0);
    }
}
