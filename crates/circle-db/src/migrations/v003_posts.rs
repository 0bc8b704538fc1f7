//! v003: posts, post_media.

use rusqlite::Connection;

use crate::error::DbResult;

pub fn migrate(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS posts (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            author_id   INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            content     TEXT,
            visibility  TEXT NOT NULL DEFAULT 'FRIENDS'
                        CHECK (visibility IN ('PUBLIC', 'FRIENDS', 'PRIVATE')),
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_posts_author_created ON posts(author_id, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(created_at DESC);

        CREATE TABLE IF NOT EXISTS post_media (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            media_type  TEXT NOT NULL CHECK (media_type IN ('IMAGE', 'VIDEO')),
            file        TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_post_media_post ON post_media(post_id);
        ",
    )?;
    Ok(())
}
