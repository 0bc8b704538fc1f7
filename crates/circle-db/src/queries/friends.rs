//! Friend request and friendship queries.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use circle_models::{
    FriendPair, FriendRequest, FriendRequestId, FriendRequestStatus, Friendship, User, UserId,
};

use crate::error::{DbError, DbResult};
use crate::queries::parse_column;
use crate::queries::users::{user_from_row, USER_COLUMNS};

const REQUEST_COLUMNS: &str = "r.id, r.sender_id, r.receiver_id, r.status, r.created_at, r.updated_at";

/// A friend request together with the user on the other side of it.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub request: FriendRequest,
    pub counterpart: User,
}

/// A friend and the time the friendship started.
#[derive(Debug, Clone)]
pub struct FriendRecord {
    pub friend: User,
    pub since: DateTime<Utc>,
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<FriendRequest> {
    Ok(FriendRequest {
        id: FriendRequestId(row.get(0)?),
        sender: UserId(row.get(1)?),
        receiver: UserId(row.get(2)?),
        status: parse_column(3, row.get(3)?)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub fn get_request(conn: &Connection, id: FriendRequestId) -> DbResult<Option<FriendRequest>> {
    let sql = format!("SELECT {} FROM friend_requests r WHERE r.id = ?1", REQUEST_COLUMNS);
    let request = conn.query_row(&sql, [id.get()], request_from_row).optional()?;
    Ok(request)
}

/// Requests between two users in either direction.
pub fn requests_between(conn: &Connection, a: UserId, b: UserId) -> DbResult<Vec<FriendRequest>> {
    let sql = format!(
        "SELECT {} FROM friend_requests r
         WHERE (r.sender_id = ?1 AND r.receiver_id = ?2) OR (r.sender_id = ?2 AND r.receiver_id = ?1)",
        REQUEST_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let requests = stmt
        .query_map(params![a.get(), b.get()], request_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(requests)
}

pub fn insert_request(conn: &Connection, sender: UserId, receiver: UserId) -> DbResult<FriendRequest> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO friend_requests (sender_id, receiver_id, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![sender.get(), receiver.get(), FriendRequestStatus::Pending.as_str(), now],
    )?;
    Ok(FriendRequest {
        id: FriendRequestId(conn.last_insert_rowid()),
        sender,
        receiver,
        status: FriendRequestStatus::Pending,
        created_at: now,
        updated_at: now,
    })
}

pub fn set_request_status(
    conn: &Connection,
    id: FriendRequestId,
    status: FriendRequestStatus,
) -> DbResult<()> {
    let changed = conn.execute(
        "UPDATE friend_requests SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id.get(), status.as_str(), Utc::now()],
    )?;
    if changed == 0 {
        return Err(DbError::not_found(format!("friend request {}", id)));
    }
    Ok(())
}

pub fn delete_request(conn: &Connection, id: FriendRequestId) -> DbResult<bool> {
    let deleted = conn.execute("DELETE FROM friend_requests WHERE id = ?1", [id.get()])?;
    Ok(deleted > 0)
}

/// Remove every request between two users; returns how many were removed.
pub fn delete_requests_between(conn: &Connection, a: UserId, b: UserId) -> DbResult<usize> {
    let deleted = conn.execute(
        "DELETE FROM friend_requests
         WHERE (sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1)",
        params![a.get(), b.get()],
    )?;
    Ok(deleted)
}

fn requests_with_counterpart(
    conn: &Connection,
    user: UserId,
    own_column: &str,
    other_column: &str,
) -> DbResult<Vec<RequestRecord>> {
    let sql = format!(
        "SELECT {}, {} FROM friend_requests r
         JOIN users u ON u.id = r.{}
         WHERE r.{} = ?1 AND r.status = ?2
         ORDER BY r.created_at DESC, r.id DESC",
        REQUEST_COLUMNS, USER_COLUMNS, other_column, own_column
    );
    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map(params![user.get(), FriendRequestStatus::Pending.as_str()], |row| {
            Ok(RequestRecord {
                request: request_from_row(row)?,
                counterpart: user_from_row(row, 6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

/// Pending requests received by `user`, newest first, with their senders.
pub fn incoming_requests(conn: &Connection, user: UserId) -> DbResult<Vec<RequestRecord>> {
    requests_with_counterpart(conn, user, "receiver_id", "sender_id")
}

/// Pending requests sent by `user`, newest first, with their receivers.
pub fn outgoing_requests(conn: &Connection, user: UserId) -> DbResult<Vec<RequestRecord>> {
    requests_with_counterpart(conn, user, "sender_id", "receiver_id")
}

pub fn insert_friendship(conn: &Connection, pair: FriendPair) -> DbResult<Friendship> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO friendships (user1_id, user2_id, created_at) VALUES (?1, ?2, ?3)",
        params![pair.user1().get(), pair.user2().get(), now],
    )?;
    Ok(Friendship {
        user1: pair.user1(),
        user2: pair.user2(),
        created_at: now,
    })
}

pub fn are_friends(conn: &Connection, a: UserId, b: UserId) -> DbResult<bool> {
    let pair = FriendPair::new(a, b);
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM friendships WHERE user1_id = ?1 AND user2_id = ?2)",
        params![pair.user1().get(), pair.user2().get()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn delete_friendship(conn: &Connection, pair: FriendPair) -> DbResult<bool> {
    let deleted = conn.execute(
        "DELETE FROM friendships WHERE user1_id = ?1 AND user2_id = ?2",
        params![pair.user1().get(), pair.user2().get()],
    )?;
    Ok(deleted > 0)
}

/// Ids of everyone `user` is friends with.
pub fn friend_ids(conn: &Connection, user: UserId) -> DbResult<Vec<UserId>> {
    let mut stmt = conn.prepare(
        "SELECT CASE WHEN user1_id = ?1 THEN user2_id ELSE user1_id END
         FROM friendships WHERE user1_id = ?1 OR user2_id = ?1",
    )?;
    let ids = stmt
        .query_map([user.get()], |row| row.get(0).map(UserId))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}

/// Friends of `user`, most recent friendship first.
pub fn list_friends(conn: &Connection, user: UserId) -> DbResult<Vec<FriendRecord>> {
    let sql = format!(
        "SELECT {}, f.created_at FROM friendships f
         JOIN users u ON u.id = CASE WHEN f.user1_id = ?1 THEN f.user2_id ELSE f.user1_id END
         WHERE f.user1_id = ?1 OR f.user2_id = ?1
         ORDER BY f.created_at DESC, f.id DESC",
        USER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let friends = stmt
        .query_map([user.get()], |row| {
            Ok(FriendRecord {
                friend: user_from_row(row, 0)?,
                since: row.get(12)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(friends)
}
