//! Like and comment queries.

use std::collections::HashMap;

use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use circle_models::{Comment, CommentId, PostId, UserId};

use crate::error::DbResult;
use crate::queries::placeholders;

/// Aggregated engagement for one post as seen by one viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostStats {
    pub like_count: i64,
    pub comment_count: i64,
    pub liked_by_me: bool,
}

/// A comment with its author's username.
#[derive(Debug, Clone)]
pub struct CommentRecord {
    pub comment: Comment,
    pub author_name: String,
}

/// Like a post. Returns `false` if the like already existed.
pub fn like(conn: &Connection, post_id: PostId, user: UserId) -> DbResult<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO likes (post_id, user_id, created_at) VALUES (?1, ?2, ?3)",
        params![post_id.get(), user.get(), Utc::now()],
    )?;
    Ok(inserted > 0)
}

/// Remove a like. Returns `false` if there was none.
pub fn unlike(conn: &Connection, post_id: PostId, user: UserId) -> DbResult<bool> {
    let deleted = conn.execute(
        "DELETE FROM likes WHERE post_id = ?1 AND user_id = ?2",
        params![post_id.get(), user.get()],
    )?;
    Ok(deleted > 0)
}

pub fn like_count(conn: &Connection, post_id: PostId) -> DbResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM likes WHERE post_id = ?1",
        [post_id.get()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Like/comment counts and the viewer's like flag for each post.
/// Posts without engagement get zeroed stats.
pub fn stats_for_posts(
    conn: &Connection,
    post_ids: &[PostId],
    viewer: UserId,
) -> DbResult<HashMap<PostId, PostStats>> {
    let mut stats: HashMap<PostId, PostStats> =
        post_ids.iter().map(|id| (*id, PostStats::default())).collect();
    if post_ids.is_empty() {
        return Ok(stats);
    }
    let ids = || post_ids.iter().map(|id| id.get());
    let list = placeholders(post_ids.len());

    let mut stmt = conn.prepare(&format!(
        "SELECT post_id, COUNT(*), SUM(CASE WHEN user_id = ? THEN 1 ELSE 0 END)
         FROM likes WHERE post_id IN ({}) GROUP BY post_id",
        list
    ))?;
    let mut rows = stmt.query(params_from_iter(std::iter::once(viewer.get()).chain(ids())))?;
    while let Some(row) = rows.next()? {
        let entry = stats.entry(PostId(row.get(0)?)).or_default();
        entry.like_count = row.get(1)?;
        entry.liked_by_me = row.get::<_, i64>(2)? > 0;
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT post_id, COUNT(*) FROM comments WHERE post_id IN ({}) GROUP BY post_id",
        list
    ))?;
    let mut rows = stmt.query(params_from_iter(ids()))?;
    while let Some(row) = rows.next()? {
        stats.entry(PostId(row.get(0)?)).or_default().comment_count = row.get(1)?;
    }

    Ok(stats)
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<CommentRecord> {
    Ok(CommentRecord {
        comment: Comment {
            id: CommentId(row.get(0)?),
            post_id: PostId(row.get(1)?),
            author: UserId(row.get(2)?),
            content: row.get(3)?,
            created_at: row.get(4)?,
        },
        author_name: row.get(5)?,
    })
}

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.author_id, c.content, c.created_at, u.username
     FROM comments c JOIN users u ON u.id = c.author_id";

pub fn insert_comment(
    conn: &Connection,
    post_id: PostId,
    author: UserId,
    content: &str,
) -> DbResult<Comment> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO comments (post_id, author_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![post_id.get(), author.get(), content, now],
    )?;
    Ok(Comment {
        id: CommentId(conn.last_insert_rowid()),
        post_id,
        author,
        content: content.to_string(),
        created_at: now,
    })
}

pub fn get_comment(conn: &Connection, id: CommentId) -> DbResult<Option<CommentRecord>> {
    let sql = format!("{} WHERE c.id = ?1", COMMENT_SELECT);
    let comment = conn.query_row(&sql, [id.get()], comment_from_row).optional()?;
    Ok(comment)
}

/// Comments on a post, oldest first.
pub fn comments_for_post(conn: &Connection, post_id: PostId) -> DbResult<Vec<CommentRecord>> {
    let sql = format!(
        "{} WHERE c.post_id = ?1 ORDER BY c.created_at, c.id",
        COMMENT_SELECT
    );
    let mut stmt = conn.prepare(&sql)?;
    let comments = stmt
        .query_map([post_id.get()], comment_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(comments)
}

pub fn delete_comment(conn: &Connection, id: CommentId) -> DbResult<bool> {
    let deleted = conn.execute("DELETE FROM comments WHERE id = ?1", [id.get()])?;
    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::posts::{delete_post, insert_post};
    use crate::queries::test_support::{db, user};
    use circle_models::Visibility;

    #[test]
    fn test_like_is_idempotent() {
        let db = db();
        let ada = user(&db, "ada");
        let bob = user(&db, "bob");
        let post = db
            .with_conn(|c| insert_post(c, ada.id, Some("hello"), Visibility::Public))
            .unwrap();

        assert!(db.with_conn(|c| like(c, post.id, bob.id)).unwrap());
        assert!(!db.with_conn(|c| like(c, post.id, bob.id)).unwrap());
        assert_eq!(db.with_conn(|c| like_count(c, post.id)).unwrap(), 1);

        assert!(db.with_conn(|c| unlike(c, post.id, bob.id)).unwrap());
        assert!(!db.with_conn(|c| unlike(c, post.id, bob.id)).unwrap());
        assert_eq!(db.with_conn(|c| like_count(c, post.id)).unwrap(), 0);
    }

    #[test]
    fn test_stats_for_posts() {
        let db = db();
        let ada = user(&db, "ada");
        let bob = user(&db, "bob");
        let first = db
            .with_conn(|c| insert_post(c, ada.id, Some("one"), Visibility::Public))
            .unwrap();
        let second = db
            .with_conn(|c| insert_post(c, ada.id, Some("two"), Visibility::Public))
            .unwrap();

        db.with_conn(|c| like(c, first.id, ada.id)).unwrap();
        db.with_conn(|c| like(c, first.id, bob.id)).unwrap();
        db.with_conn(|c| insert_comment(c, first.id, bob.id, "nice")).unwrap();

        let stats = db
            .with_conn(|c| stats_for_posts(c, &[first.id, second.id], bob.id))
            .unwrap();
        assert_eq!(
            stats[&first.id],
            PostStats {
                like_count: 2,
                comment_count: 1,
                liked_by_me: true
            }
        );
        assert_eq!(stats[&second.id], PostStats::default());
        assert!(db.with_conn(|c| stats_for_posts(c, &[], bob.id)).unwrap().is_empty());
    }

    #[test]
    fn test_comments_lifecycle() {
        let db = db();
        let ada = user(&db, "ada");
        let bob = user(&db, "bob");
        let post = db
            .with_conn(|c| insert_post(c, ada.id, Some("hello"), Visibility::Public))
            .unwrap();

        let first = db.with_conn(|c| insert_comment(c, post.id, bob.id, "first")).unwrap();
        db.with_conn(|c| insert_comment(c, post.id, ada.id, "second")).unwrap();

        let comments = db.with_conn(|c| comments_for_post(c, post.id)).unwrap();
        let texts: Vec<_> = comments.iter().map(|r| r.comment.content.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(comments[0].author_name, "bob");

        let stored = db.with_conn(|c| get_comment(c, first.id)).unwrap().unwrap();
        assert_eq!(stored.comment.author, bob.id);

        assert!(db.with_conn(|c| delete_comment(c, first.id)).unwrap());
        assert!(db.with_conn(|c| get_comment(c, first.id)).unwrap().is_none());

        // Deleting the post cascades to its remaining comments
        db.with_conn(|c| delete_post(c, post.id)).unwrap();
        assert!(db.with_conn(|c| comments_for_post(c, post.id)).unwrap().is_empty());
    }
}
