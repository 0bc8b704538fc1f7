//! Row identifiers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Get the raw row id.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

row_id!(
    /// Identifier of a user account.
    UserId
);
row_id!(
    /// Identifier of a post.
    PostId
);
row_id!(
    /// Identifier of a comment.
    CommentId
);
row_id!(
    /// Identifier of a friend request.
    FriendRequestId
);
row_id!(
    /// Identifier of a media attachment.
    MediaId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_numbers() {
        assert_eq!(serde_json::to_string(&UserId(7)).unwrap(), "7");
        let id: PostId = serde_json::from_str("42").unwrap();
        assert_eq!(id, PostId(42));
    }

    #[test]
    fn test_ids_order_by_value() {
        assert!(UserId(1) < UserId(2));
        assert_eq!(UserId::from(3).get(), 3);
    }
}
