//! Versioned schema migrations.
//!
//! Each migration runs once, inside its own transaction, and is recorded
//! in `schema_migrations`.

mod v001_accounts;
mod v002_friends;
mod v003_posts;
mod v004_engagement;

use rusqlite::{params, Connection};
use tracing::info;

use crate::error::{DbError, DbResult};

type MigrationFn = fn(&Connection) -> DbResult<()>;

const MIGRATIONS: &[(i64, &str, MigrationFn)] = &[
    (1, "accounts", v001_accounts::migrate),
    (2, "friends", v002_friends::migrate),
    (3, "posts", v003_posts::migrate),
    (4, "engagement", v004_engagement::migrate),
];

/// Latest schema version.
pub const LATEST_VERSION: i64 = 4;

/// Apply every migration newer than the recorded schema version.
pub fn run_migrations(conn: &mut Connection) -> DbResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY,
            name        TEXT NOT NULL,
            applied_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );",
    )?;

    let current = current_version(conn)?;
    for (version, name, migrate) in MIGRATIONS.iter().filter(|(v, _, _)| *v > current) {
        let tx = conn.transaction()?;
        migrate(&tx).map_err(|e| DbError::Migration(format!("v{:03} {}: {}", version, name, e)))?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![version, name],
        )?;
        tx.commit()?;
        info!(version = *version, name = *name, "Applied migration");
    }
    Ok(())
}

/// Highest applied migration, 0 for a fresh database.
pub fn current_version(conn: &Connection) -> DbResult<i64> {
    let version: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), LATEST_VERSION);
        run_migrations(&mut conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), LATEST_VERSION);
    }

    #[test]
    fn test_latest_version_matches_list() {
        assert_eq!(MIGRATIONS.last().map(|(v, _, _)| *v), Some(LATEST_VERSION));
    }
}
