//! v002: friend_requests, friendships.

use rusqlite::Connection;

use crate::error::DbResult;

pub fn migrate(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS friend_requests (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            sender_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            receiver_id  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            status       TEXT NOT NULL DEFAULT 'pending'
                         CHECK (status IN ('pending', 'accepted', 'rejected')),
            created_at   TEXT NOT NULL,
            updated_at   TEXT NOT NULL,
            UNIQUE (sender_id, receiver_id),
            CHECK (sender_id <> receiver_id)
        );

        CREATE INDEX IF NOT EXISTS idx_friend_requests_receiver
            ON friend_requests(receiver_id, status);

        -- Pairs are stored with the lower id first so one row covers both orientations
        CREATE TABLE IF NOT EXISTS friendships (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user1_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            user2_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL,
            UNIQUE (user1_id, user2_id),
            CHECK (user1_id < user2_id)
        );

        CREATE INDEX IF NOT EXISTS idx_friendships_user2 ON friendships(user2_id);
        ",
    )?;
    Ok(())
}
