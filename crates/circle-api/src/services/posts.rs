//! Posts, the feed, likes and comments.
//!
//! Every read goes through the visibility rule: a post the viewer may not
//! see is reported as missing rather than forbidden.

use std::sync::Arc;

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use circle_db::queries::{engagement, friends, posts, users};
use circle_db::{CommentRecord, Connection, Database, DbResult, PostRecord, PostStats};
use circle_media::{MediaDir, MediaStore};
use circle_models::{
    parse_post_fields, CommentId, CommentRequest, MediaId, MediaType, PostId, PostMedia,
    PostUpdateRequest, User, UserId, ViewerRelation, Visibility,
};

use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// Default page size for post listings.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page size a client may ask for.
pub const MAX_PAGE_SIZE: u32 = 100;

const EMPTY_POST: &str = "Post must contain text or media.";

/// An uploaded file, buffered.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl Upload {
    pub fn media_type(&self) -> Option<MediaType> {
        MediaType::from_content_type(&self.content_type)
    }
}

/// Raw fields of a new post, from either a JSON or a multipart body.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub content: Option<String>,
    pub visibility: Option<String>,
    pub uploads: Vec<Upload>,
}

/// Limit/offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaView {
    pub id: MediaId,
    pub media_type: MediaType,
    /// Media URL
    pub file: String,
    pub created_at: DateTime<Utc>,
}

/// Serialized post.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: PostId,
    pub author: UserId,
    pub author_name: String,
    pub author_email: String,
    pub content: Option<String>,
    pub visibility: Visibility,
    pub media: Vec<MediaView>,
    pub like_count: i64,
    pub comment_count: i64,
    pub liked_by_me: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LikeStatus {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: CommentId,
    pub post: PostId,
    pub author: UserId,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<CommentRecord> for CommentView {
    fn from(record: CommentRecord) -> Self {
        Self {
            id: record.comment.id,
            post: record.comment.post_id,
            author: record.comment.author,
            author_name: record.author_name,
            content: record.comment.content,
            created_at: record.comment.created_at,
        }
    }
}

fn post_not_found() -> ApiError {
    ApiError::not_found("Post not found.")
}

/// How `viewer` relates to `author`.
fn viewer_relation(conn: &Connection, author: UserId, viewer: UserId) -> DbResult<ViewerRelation> {
    let are_friends = author != viewer && friends::are_friends(conn, author, viewer)?;
    Ok(ViewerRelation::resolve(author, viewer, are_friends))
}

/// Load a post, hiding it unless `viewer` may see it.
fn visible_post(conn: &Connection, viewer: UserId, id: PostId) -> ApiResult<PostRecord> {
    let record = posts::get_post(conn, id)?.ok_or_else(post_not_found)?;
    let relation = viewer_relation(conn, record.post.author, viewer)?;
    if record.post.visibility.allows(relation, record.author_is_private) {
        Ok(record)
    } else {
        Err(post_not_found())
    }
}

/// Load a post that `user` wrote. Viewers who can see it get 403, anyone
/// else 404.
fn own_post(conn: &Connection, user: UserId, id: PostId, action: &str) -> ApiResult<PostRecord> {
    let record = visible_post(conn, user, id)?;
    if record.post.author != user {
        return Err(ApiError::forbidden(format!(
            "You do not have permission to {} this post.",
            action
        )));
    }
    Ok(record)
}

#[derive(Clone)]
pub struct PostService {
    db: Arc<Database>,
    media: Arc<MediaStore>,
}

impl PostService {
    pub fn new(db: Arc<Database>, media: Arc<MediaStore>) -> Self {
        Self { db, media }
    }

    /// Attach media and engagement to post rows, keeping their order.
    fn views(
        &self,
        conn: &Connection,
        records: Vec<PostRecord>,
        viewer: UserId,
    ) -> DbResult<Vec<PostView>> {
        let ids: Vec<PostId> = records.iter().map(|r| r.post.id).collect();
        let mut media = posts::media_for_posts(conn, &ids)?;
        let stats = engagement::stats_for_posts(conn, &ids, viewer)?;

        Ok(records
            .into_iter()
            .map(|record| {
                let attached = media.remove(&record.post.id).unwrap_or_default();
                let stats = stats.get(&record.post.id).copied().unwrap_or_default();
                self.view(record, attached, stats)
            })
            .collect())
    }

    fn view(&self, record: PostRecord, media: Vec<PostMedia>, stats: PostStats) -> PostView {
        let PostRecord {
            post,
            author_name,
            author_email,
            ..
        } = record;
        PostView {
            id: post.id,
            author: post.author,
            author_name,
            author_email,
            content: post.content,
            visibility: post.visibility,
            media: media
                .into_iter()
                .map(|m| MediaView {
                    id: m.id,
                    media_type: m.media_type,
                    file: self.media.url(&m.file),
                    created_at: m.created_at,
                })
                .collect(),
            like_count: stats.like_count,
            comment_count: stats.comment_count,
            liked_by_me: stats.liked_by_me,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }

    fn single_view(&self, conn: &Connection, record: PostRecord, viewer: UserId) -> ApiResult<PostView> {
        self.views(conn, vec![record], viewer)?
            .pop()
            .ok_or_else(post_not_found)
    }

    /// Create a post. Every upload's type is checked before anything is
    /// written; any later failure removes the files already stored.
    pub async fn create(&self, author: &User, new: NewPost) -> ApiResult<PostView> {
        let (content, visibility) = parse_post_fields(new.content, new.visibility.as_deref())?;

        let mut typed = Vec::with_capacity(new.uploads.len());
        for upload in new.uploads {
            let media_type = upload.media_type().ok_or_else(|| {
                ApiError::field("media", "Only image and video files are allowed.")
            })?;
            typed.push((media_type, upload));
        }

        if content.is_none() && typed.is_empty() {
            return Err(ApiError::field("non_field_errors", EMPTY_POST));
        }

        let mut stored: Vec<(MediaType, String)> = Vec::with_capacity(typed.len());
        for (media_type, upload) in &typed {
            match self
                .media
                .save(MediaDir::PostMedia, &upload.file_name, &upload.bytes)
                .await
            {
                Ok(path) => stored.push((*media_type, path)),
                Err(e) => {
                    let written: Vec<String> = stored.into_iter().map(|(_, p)| p).collect();
                    self.media.delete_all(&written).await;
                    return Err(e.into());
                }
            }
        }

        let created = self.db.with_tx(|tx| -> ApiResult<PostView> {
            let post = posts::insert_post(tx, author.id, content.as_deref(), visibility)?;
            for (media_type, path) in &stored {
                posts::insert_media(tx, post.id, *media_type, path)?;
            }
            let record = posts::get_post(tx, post.id)?.ok_or_else(post_not_found)?;
            self.single_view(tx, record, author.id)
        });

        match created {
            Ok(view) => {
                info!(
                    post_id = %view.id,
                    author = %author.id,
                    media = view.media.len(),
                    visibility = %view.visibility,
                    "Post created"
                );
                metrics::record_post_created(view.media.len());
                Ok(view)
            }
            Err(e) => {
                let written: Vec<String> = stored.into_iter().map(|(_, p)| p).collect();
                self.media.delete_all(&written).await;
                Err(e)
            }
        }
    }

    /// The viewer's own posts plus their friends' non-private posts.
    pub fn feed(&self, viewer: &User, page: Page) -> ApiResult<Vec<PostView>> {
        self.db.with_conn(|conn| -> ApiResult<Vec<PostView>> {
            let records = posts::feed(conn, viewer.id, page.limit, page.offset)?;
            Ok(self.views(conn, records, viewer.id)?)
        })
    }

    pub fn get(&self, viewer: &User, id: PostId) -> ApiResult<PostView> {
        self.db.with_conn(|conn| {
            let record = visible_post(conn, viewer.id, id)?;
            self.single_view(conn, record, viewer.id)
        })
    }

    /// Posts by `username` that the viewer may see.
    pub fn by_author(&self, viewer: &User, username: &str, page: Page) -> ApiResult<Vec<PostView>> {
        self.db.with_conn(|conn| -> ApiResult<Vec<PostView>> {
            let author = users::get_user_by_username(conn, username)?
                .ok_or_else(|| ApiError::not_found("User not found."))?;

            let visibilities: &[Visibility] = match viewer_relation(conn, author.id, viewer.id)? {
                ViewerRelation::Author => &[Visibility::Public, Visibility::Friends, Visibility::Private],
                ViewerRelation::Friend => &Visibility::FRIEND_VISIBLE,
                ViewerRelation::Stranger if author.is_private_account => &[],
                ViewerRelation::Stranger => &[Visibility::Public],
            };

            let records =
                posts::posts_by_author(conn, author.id, visibilities, page.limit, page.offset)?;
            Ok(self.views(conn, records, viewer.id)?)
        })
    }

    /// Edit content and/or visibility. The post must keep text or media.
    pub fn update(&self, user: &User, id: PostId, request: PostUpdateRequest) -> ApiResult<PostView> {
        let (content, visibility) = request.validated()?;

        let view = self.db.with_tx(|tx| -> ApiResult<PostView> {
            own_post(tx, user.id, id, "edit")?;
            posts::update_post(tx, id, content.as_ref().map(|c| c.as_deref()), visibility)?;

            let record = posts::get_post(tx, id)?.ok_or_else(post_not_found)?;
            let view = self.single_view(tx, record, user.id)?;
            if view.content.is_none() && view.media.is_empty() {
                return Err(ApiError::field("non_field_errors", EMPTY_POST));
            }
            Ok(view)
        })?;

        info!(post_id = %id, user_id = %user.id, "Post updated");
        Ok(view)
    }

    /// Delete a post with its media files.
    pub async fn delete(&self, user: &User, id: PostId) -> ApiResult<()> {
        let files = self.db.with_tx(|tx| -> ApiResult<Vec<String>> {
            own_post(tx, user.id, id, "delete")?;
            Ok(posts::delete_post(tx, id)?)
        })?;

        self.media.delete_all(&files).await;
        info!(post_id = %id, user_id = %user.id, files = files.len(), "Post deleted");
        Ok(())
    }

    /// Like a visible post. Liking twice is a no-op.
    pub fn like(&self, user: &User, id: PostId) -> ApiResult<LikeStatus> {
        let (added, like_count) = self.db.with_tx(|tx| -> ApiResult<(bool, i64)> {
            visible_post(tx, user.id, id)?;
            let added = engagement::like(tx, id, user.id)?;
            Ok((added, engagement::like_count(tx, id)?))
        })?;
        if added {
            metrics::record_like("like");
        }
        Ok(LikeStatus {
            liked: true,
            like_count,
        })
    }

    pub fn unlike(&self, user: &User, id: PostId) -> ApiResult<LikeStatus> {
        let (removed, like_count) = self.db.with_tx(|tx| -> ApiResult<(bool, i64)> {
            visible_post(tx, user.id, id)?;
            let removed = engagement::unlike(tx, id, user.id)?;
            Ok((removed, engagement::like_count(tx, id)?))
        })?;
        if removed {
            metrics::record_like("unlike");
        }
        Ok(LikeStatus {
            liked: false,
            like_count,
        })
    }

    /// Comments on a visible post, oldest first.
    pub fn comments(&self, user: &User, id: PostId) -> ApiResult<Vec<CommentView>> {
        self.db.with_conn(|conn| -> ApiResult<Vec<CommentView>> {
            visible_post(conn, user.id, id)?;
            let records = engagement::comments_for_post(conn, id)?;
            Ok(records.into_iter().map(CommentView::from).collect())
        })
    }

    pub fn add_comment(
        &self,
        user: &User,
        id: PostId,
        request: CommentRequest,
    ) -> ApiResult<CommentView> {
        let content = request.validated()?;
        let comment = self.db.with_tx(|tx| -> ApiResult<CommentView> {
            visible_post(tx, user.id, id)?;
            let comment = engagement::insert_comment(tx, id, user.id, &content)?;
            Ok(CommentView::from(CommentRecord {
                comment,
                author_name: user.username.clone(),
            }))
        })?;

        info!(comment_id = %comment.id, post_id = %id, user_id = %user.id, "Comment added");
        metrics::record_comment();
        Ok(comment)
    }

    /// Delete a comment. Allowed for its author and the post's author.
    pub fn delete_comment(&self, user: &User, id: CommentId) -> ApiResult<()> {
        self.db.with_tx(|tx| -> ApiResult<()> {
            let record = engagement::get_comment(tx, id)?
                .ok_or_else(|| ApiError::not_found("Comment not found."))?;
            let post = posts::get_post(tx, record.comment.post_id)?.ok_or_else(post_not_found)?;
            if !record.comment.can_be_deleted_by(user.id, post.post.author) {
                return Err(ApiError::forbidden(
                    "You do not have permission to delete this comment.",
                ));
            }
            engagement::delete_comment(tx, id)?;
            Ok(())
        })?;

        info!(comment_id = %id, user_id = %user.id, "Comment deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        assert_eq!(Page::default(), Page { limit: 50, offset: 0 });
        assert_eq!(Page::new(Some(500), Some(10)), Page { limit: 100, offset: 10 });
        assert_eq!(Page::new(Some(0), None).limit, 1);
    }
}
