//! SQLite persistence for the Circle backend.
//!
//! This crate provides:
//! - A connection wrapper with pragmas and transactions
//! - Versioned schema migrations
//! - Query modules for users, profiles, friendships, posts and engagement
//!
//! Query functions take a `&Connection` so callers can compose several of
//! them inside one transaction via [`Database::with_tx`].

pub mod database;
pub mod error;
pub mod migrations;
pub mod queries;

pub use database::Database;
pub use error::{DbError, DbResult};
pub use queries::engagement::{CommentRecord, PostStats};
pub use queries::friends::{FriendRecord, RequestRecord};
pub use queries::posts::PostRecord;
pub use queries::profiles::ProfileChanges;
pub use queries::users::NewUser;
pub use rusqlite::Connection;
