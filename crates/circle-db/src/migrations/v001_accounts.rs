//! v001: users, profiles.

use rusqlite::Connection;

use crate::error::DbResult;

pub fn migrate(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            email               TEXT NOT NULL UNIQUE COLLATE NOCASE,
            username            TEXT NOT NULL UNIQUE,
            password_hash       TEXT NOT NULL,
            bio                 TEXT NOT NULL DEFAULT '',
            date_of_birth       TEXT,
            gender              TEXT CHECK (gender IN ('M', 'F', 'O')),
            profile_picture     TEXT,
            is_private_account  INTEGER NOT NULL DEFAULT 0,
            is_staff            INTEGER NOT NULL DEFAULT 0,
            is_active           INTEGER NOT NULL DEFAULT 1,
            created_at          TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS profiles (
            user_id          INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
            bio              TEXT,
            profile_picture  TEXT,
            location         TEXT,
            date_of_birth    TEXT,
            created_at       TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}
