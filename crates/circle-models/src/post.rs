//! Posts, their media attachments and the visibility rule.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;
use crate::ids::{MediaId, PostId, UserId};

/// Maximum length of a post's text content.
pub const MAX_POST_CONTENT_LENGTH: usize = 10_000;

/// Who may see a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    /// Anyone, unless the author's account is private
    Public,
    /// The author and the author's friends
    #[default]
    Friends,
    /// Only the author
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::Friends => "FRIENDS",
            Visibility::Private => "PRIVATE",
        }
    }

    /// Visibilities a friend of the author is allowed to see.
    pub const FRIEND_VISIBLE: [Visibility; 2] = [Visibility::Public, Visibility::Friends];

    /// Apply the visibility rule for a viewer.
    ///
    /// `author_is_private` is the author's `is_private_account` flag; a
    /// private account hides even public posts from strangers.
    pub fn allows(&self, relation: ViewerRelation, author_is_private: bool) -> bool {
        match relation {
            ViewerRelation::Author => true,
            ViewerRelation::Friend => matches!(self, Visibility::Public | Visibility::Friends),
            ViewerRelation::Stranger => matches!(self, Visibility::Public) && !author_is_private,
        }
    }
}

impl FromStr for Visibility {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PUBLIC" => Ok(Visibility::Public),
            "FRIENDS" => Ok(Visibility::Friends),
            "PRIVATE" => Ok(Visibility::Private),
            other => Err(ModelError::InvalidVisibility(other.to_string())),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the viewer of a post relates to its author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerRelation {
    Author,
    Friend,
    Stranger,
}

impl ViewerRelation {
    pub fn resolve(author: UserId, viewer: UserId, are_friends: bool) -> Self {
        if author == viewer {
            ViewerRelation::Author
        } else if are_friends {
            ViewerRelation::Friend
        } else {
            ViewerRelation::Stranger
        }
    }
}

/// A post. Text content is optional as long as media is attached.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Post {
    pub id: PostId,
    pub author: UserId,
    pub content: Option<String>,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn has_text(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}

/// Kind of attached media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "IMAGE",
            MediaType::Video => "VIDEO",
        }
    }

    /// Classify an upload by its MIME type. Only images and videos are accepted.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let content_type = content_type.trim().to_ascii_lowercase();
        if content_type.starts_with("image/") {
            Some(MediaType::Image)
        } else if content_type.starts_with("video/") {
            Some(MediaType::Video)
        } else {
            None
        }
    }
}

impl FromStr for MediaType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IMAGE" => Ok(MediaType::Image),
            "VIDEO" => Ok(MediaType::Video),
            other => Err(ModelError::InvalidMediaType(other.to_string())),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A media file attached to a post, kept in upload order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PostMedia {
    pub id: MediaId,
    pub post_id: PostId,
    pub media_type: MediaType,
    /// Relative media path
    pub file: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_default_is_friends() {
        assert_eq!(Visibility::default(), Visibility::Friends);
    }

    #[test]
    fn test_visibility_parse() {
        assert_eq!("PUBLIC".parse::<Visibility>(), Ok(Visibility::Public));
        assert!("public".parse::<Visibility>().is_err());
        assert!("EVERYONE".parse::<Visibility>().is_err());
        assert_eq!(serde_json::to_string(&Visibility::Private).unwrap(), "\"PRIVATE\"");
    }

    #[test]
    fn test_author_sees_everything() {
        for v in [Visibility::Public, Visibility::Friends, Visibility::Private] {
            assert!(v.allows(ViewerRelation::Author, true));
        }
    }

    #[test]
    fn test_friend_visibility() {
        assert!(Visibility::Public.allows(ViewerRelation::Friend, true));
        assert!(Visibility::Friends.allows(ViewerRelation::Friend, false));
        assert!(!Visibility::Private.allows(ViewerRelation::Friend, false));
    }

    #[test]
    fn test_stranger_visibility() {
        assert!(Visibility::Public.allows(ViewerRelation::Stranger, false));
        assert!(!Visibility::Public.allows(ViewerRelation::Stranger, true));
        assert!(!Visibility::Friends.allows(ViewerRelation::Stranger, false));
        assert!(!Visibility::Private.allows(ViewerRelation::Stranger, false));
    }

    #[test]
    fn test_viewer_relation() {
        assert_eq!(ViewerRelation::resolve(UserId(1), UserId(1), false), ViewerRelation::Author);
        assert_eq!(ViewerRelation::resolve(UserId(1), UserId(2), true), ViewerRelation::Friend);
        assert_eq!(ViewerRelation::resolve(UserId(1), UserId(2), false), ViewerRelation::Stranger);
    }

    #[test]
    fn test_media_type_from_content_type() {
        assert_eq!(MediaType::from_content_type("image/png"), Some(MediaType::Image));
        assert_eq!(MediaType::from_content_type("Video/MP4"), Some(MediaType::Video));
        assert_eq!(MediaType::from_content_type("application/pdf"), None);
        assert_eq!(MediaType::from_content_type("imagery"), None);
    }

    #[test]
    fn test_post_has_text() {
        let mut post = Post {
            id: PostId(1),
            author: UserId(1),
            content: Some("  ".to_string()),
            visibility: Visibility::Public,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!post.has_text());
        post.content = Some("hello".to_string());
        assert!(post.has_text());
    }
}
