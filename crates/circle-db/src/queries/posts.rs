//! Post and media queries.

use std::collections::HashMap;

use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use circle_models::{MediaId, MediaType, Post, PostId, PostMedia, UserId, Visibility};

use crate::error::{DbError, DbResult};
use crate::queries::{parse_column, placeholders};

const POST_COLUMNS: &str = "p.id, p.author_id, p.content, p.visibility, p.created_at, p.updated_at, \
     u.username, u.email, u.is_private_account";

/// A post with the author fields its serialized form needs.
#[derive(Debug, Clone)]
pub struct PostRecord {
    pub post: Post,
    pub author_name: String,
    pub author_email: String,
    pub author_is_private: bool,
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRecord> {
    Ok(PostRecord {
        post: Post {
            id: PostId(row.get(0)?),
            author: UserId(row.get(1)?),
            content: row.get(2)?,
            visibility: parse_column(3, row.get(3)?)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        },
        author_name: row.get(6)?,
        author_email: row.get(7)?,
        author_is_private: row.get(8)?,
    })
}

fn query_posts(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> DbResult<Vec<PostRecord>> {
    let sql = format!(
        "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id WHERE {}",
        POST_COLUMNS, filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let posts = stmt
        .query_map(params, post_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(posts)
}

pub fn insert_post(
    conn: &Connection,
    author: UserId,
    content: Option<&str>,
    visibility: Visibility,
) -> DbResult<Post> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO posts (author_id, content, visibility, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![author.get(), content, visibility.as_str(), now],
    )?;
    Ok(Post {
        id: PostId(conn.last_insert_rowid()),
        author,
        content: content.map(str::to_string),
        visibility,
        created_at: now,
        updated_at: now,
    })
}

pub fn insert_media(
    conn: &Connection,
    post_id: PostId,
    media_type: MediaType,
    file: &str,
) -> DbResult<PostMedia> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO post_media (post_id, media_type, file, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![post_id.get(), media_type.as_str(), file, now],
    )?;
    Ok(PostMedia {
        id: MediaId(conn.last_insert_rowid()),
        post_id,
        media_type,
        file: file.to_string(),
        created_at: now,
    })
}

pub fn get_post(conn: &Connection, id: PostId) -> DbResult<Option<PostRecord>> {
    let sql = format!(
        "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id WHERE p.id = ?1",
        POST_COLUMNS
    );
    let post = conn.query_row(&sql, [id.get()], post_from_row).optional()?;
    Ok(post)
}

/// Update content and/or visibility. `content: Some(None)` clears the text.
pub fn update_post(
    conn: &Connection,
    id: PostId,
    content: Option<Option<&str>>,
    visibility: Option<Visibility>,
) -> DbResult<()> {
    let now = Utc::now();
    let changed = match content {
        Some(text) => conn.execute(
            "UPDATE posts SET content = ?2, visibility = COALESCE(?3, visibility), updated_at = ?4
             WHERE id = ?1",
            params![id.get(), text, visibility.map(|v| v.as_str()), now],
        )?,
        None => conn.execute(
            "UPDATE posts SET visibility = COALESCE(?2, visibility), updated_at = ?3 WHERE id = ?1",
            params![id.get(), visibility.map(|v| v.as_str()), now],
        )?,
    };
    if changed == 0 {
        return Err(DbError::not_found(format!("post {}", id)));
    }
    Ok(())
}

/// Delete a post (media rows, likes and comments cascade). Returns the
/// stored media paths so the caller can remove the files.
pub fn delete_post(conn: &Connection, id: PostId) -> DbResult<Vec<String>> {
    let files = media_for_post(conn, id)?
        .into_iter()
        .map(|m| m.file)
        .collect();
    let deleted = conn.execute("DELETE FROM posts WHERE id = ?1", [id.get()])?;
    if deleted == 0 {
        return Err(DbError::not_found(format!("post {}", id)));
    }
    Ok(files)
}

fn media_from_row(row: &Row<'_>) -> rusqlite::Result<PostMedia> {
    Ok(PostMedia {
        id: MediaId(row.get(0)?),
        post_id: PostId(row.get(1)?),
        media_type: parse_column(2, row.get(2)?)?,
        file: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Media of one post in upload order.
pub fn media_for_post(conn: &Connection, post_id: PostId) -> DbResult<Vec<PostMedia>> {
    let mut stmt = conn.prepare(
        "SELECT id, post_id, media_type, file, created_at FROM post_media
         WHERE post_id = ?1 ORDER BY created_at, id",
    )?;
    let media = stmt
        .query_map([post_id.get()], media_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(media)
}

/// Media of several posts, grouped by post, each group in upload order.
pub fn media_for_posts(conn: &Connection, post_ids: &[PostId]) -> DbResult<HashMap<PostId, Vec<PostMedia>>> {
    let mut grouped: HashMap<PostId, Vec<PostMedia>> = HashMap::new();
    if post_ids.is_empty() {
        return Ok(grouped);
    }
    let sql = format!(
        "SELECT id, post_id, media_type, file, created_at FROM post_media
         WHERE post_id IN ({}) ORDER BY created_at, id",
        placeholders(post_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(post_ids.iter().map(|id| id.get())), media_from_row)?;
    for media in rows {
        let media = media?;
        grouped.entry(media.post_id).or_default().push(media);
    }
    Ok(grouped)
}

/// The viewer's own posts plus friends' posts a friend may see, newest first.
pub fn feed(conn: &Connection, viewer: UserId, limit: u32, offset: u32) -> DbResult<Vec<PostRecord>> {
    query_posts(
        conn,
        "p.author_id = ?1
            OR (p.visibility IN ('PUBLIC', 'FRIENDS') AND p.author_id IN (
                SELECT CASE WHEN f.user1_id = ?1 THEN f.user2_id ELSE f.user1_id END
                FROM friendships f WHERE f.user1_id = ?1 OR f.user2_id = ?1))
         ORDER BY p.created_at DESC, p.id DESC
         LIMIT ?2 OFFSET ?3",
        params![viewer.get(), limit, offset],
    )
}

/// Posts by `author` restricted to the given visibilities, newest first.
pub fn posts_by_author(
    conn: &Connection,
    author: UserId,
    visibilities: &[Visibility],
    limit: u32,
    offset: u32,
) -> DbResult<Vec<PostRecord>> {
    if visibilities.is_empty() {
        return Ok(Vec::new());
    }
    let list = visibilities
        .iter()
        .map(|v| format!("'{}'", v.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    query_posts(
        conn,
        &format!(
            "p.author_id = ?1 AND p.visibility IN ({})
             ORDER BY p.created_at DESC, p.id DESC
             LIMIT ?2 OFFSET ?3",
            list
        ),
        params![author.get(), limit, offset],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::friends::insert_friendship;
    use crate::queries::test_support::{db, user};
    use circle_models::FriendPair;

    #[test]
    fn test_post_with_media_roundtrip() {
        let db = db();
        let ada = user(&db, "ada");

        let post = db
            .with_tx(|tx| {
                let post = insert_post(tx, ada.id, None, Visibility::Public)?;
                insert_media(tx, post.id, MediaType::Image, "post_media/1.png")?;
                insert_media(tx, post.id, MediaType::Video, "post_media/2.mp4")?;
                Ok::<_, DbError>(post)
            })
            .unwrap();

        let record = db.with_conn(|c| get_post(c, post.id)).unwrap().unwrap();
        assert_eq!(record.author_name, "ada");
        assert_eq!(record.post.visibility, Visibility::Public);

        let media = db.with_conn(|c| media_for_posts(c, &[post.id])).unwrap();
        let files: Vec<_> = media[&post.id].iter().map(|m| m.file.as_str()).collect();
        assert_eq!(files, vec!["post_media/1.png", "post_media/2.mp4"]);

        let removed = db.with_conn(|c| delete_post(c, post.id)).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(db.with_conn(|c| media_for_post(c, post.id)).unwrap().is_empty());
        assert!(db.with_conn(|c| get_post(c, post.id)).unwrap().is_none());
    }

    #[test]
    fn test_feed_gating() {
        let db = db();
        let ada = user(&db, "ada");
        let bob = user(&db, "bob");
        let eve = user(&db, "eve");
        db.with_conn(|c| insert_friendship(c, FriendPair::new(ada.id, bob.id)))
            .unwrap();

        let post = |author: UserId, text: &str, v: Visibility| {
            db.with_conn(|c| insert_post(c, author, Some(text), v)).unwrap()
        };
        post(ada.id, "ada private", Visibility::Private);
        post(bob.id, "bob friends", Visibility::Friends);
        post(bob.id, "bob private", Visibility::Private);
        post(bob.id, "bob public", Visibility::Public);
        post(eve.id, "eve public", Visibility::Public);

        let rows = db.with_conn(|c| feed(c, ada.id, 50, 0)).unwrap();
        let texts: Vec<_> = rows.iter().map(|r| r.post.content.clone().unwrap()).collect();
        assert_eq!(texts, vec!["bob public", "bob friends", "ada private"]);

        let page = db.with_conn(|c| feed(c, ada.id, 1, 1)).unwrap();
        assert_eq!(page[0].post.content.as_deref(), Some("bob friends"));
    }

    #[test]
    fn test_posts_by_author_filters_visibility() {
        let db = db();
        let bob = user(&db, "bob");
        for v in [Visibility::Public, Visibility::Friends, Visibility::Private] {
            db.with_conn(|c| insert_post(c, bob.id, Some(v.as_str()), v)).unwrap();
        }
        let public = db
            .with_conn(|c| posts_by_author(c, bob.id, &[Visibility::Public], 50, 0))
            .unwrap();
        assert_eq!(public.len(), 1);
        let friend = db
            .with_conn(|c| posts_by_author(c, bob.id, &Visibility::FRIEND_VISIBLE, 50, 0))
            .unwrap();
        assert_eq!(friend.len(), 2);
        assert!(db.with_conn(|c| posts_by_author(c, bob.id, &[], 50, 0)).unwrap().is_empty());
    }

    #[test]
    fn test_update_post() {
        let db = db();
        let ada = user(&db, "ada");
        let post = db
            .with_conn(|c| insert_post(c, ada.id, Some("draft"), Visibility::Friends))
            .unwrap();

        db.with_conn(|c| update_post(c, post.id, None, Some(Visibility::Public)))
            .unwrap();
        let record = db.with_conn(|c| get_post(c, post.id)).unwrap().unwrap();
        assert_eq!(record.post.visibility, Visibility::Public);
        assert_eq!(record.post.content.as_deref(), Some("draft"));

        db.with_conn(|c| update_post(c, post.id, Some(Some("final")), None)).unwrap();
        let record = db.with_conn(|c| get_post(c, post.id)).unwrap().unwrap();
        assert_eq!(record.post.content.as_deref(), Some("final"));
        assert_eq!(record.post.visibility, Visibility::Public);

        let missing = db.with_conn(|c| update_post(c, PostId(999), None, None));
        assert!(matches!(missing, Err(DbError::NotFound(_))));
    }
}
