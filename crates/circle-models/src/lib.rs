//! Shared data models for the Circle backend.
//!
//! This crate provides Serde-serializable types for:
//! - Users, profiles and their identifiers
//! - Friend requests and friendships
//! - Posts, media attachments, likes and comments
//! - Request payloads and their validation rules
//! - The post visibility rule

pub mod engagement;
pub mod error;
pub mod friend;
pub mod ids;
pub mod post;
pub mod profile;
pub mod requests;
pub mod user;
pub mod validation;

// Re-export common types
pub use engagement::{Comment, Like};
pub use error::{ModelError, ModelResult};
pub use friend::{FriendPair, FriendRequest, FriendRequestStatus, Friendship};
pub use ids::{CommentId, FriendRequestId, MediaId, PostId, UserId};
pub use post::{MediaType, Post, PostMedia, ViewerRelation, Visibility};
pub use profile::Profile;
pub use requests::{
    parse_post_fields, CommentRequest, LoginRequest, PostUpdateRequest, ProfileUpdateRequest,
    RefreshRequest, RegisterRequest, ValidatedRegistration,
};
pub use user::{Gender, User};
pub use validation::FieldErrors;
