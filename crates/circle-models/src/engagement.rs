//! Likes and comments.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{CommentId, PostId, UserId};

/// Maximum comment length in characters.
pub const MAX_COMMENT_LENGTH: usize = 2000;

/// A user's like on a post. At most one per (post, user).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Like {
    pub post_id: PostId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// A comment on a post.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Comment author and post author may both delete a comment.
    pub fn can_be_deleted_by(&self, user: UserId, post_author: UserId) -> bool {
        self.author == user || post_author == user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_delete_permission() {
        let comment = Comment {
            id: CommentId(1),
            post_id: PostId(1),
            author: UserId(2),
            content: "nice".to_string(),
            created_at: Utc::now(),
        };
        assert!(comment.can_be_deleted_by(UserId(2), UserId(1)));
        assert!(comment.can_be_deleted_by(UserId(1), UserId(1)));
        assert!(!comment.can_be_deleted_by(UserId(3), UserId(1)));
    }
}
