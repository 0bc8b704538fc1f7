//! Media storage for uploaded files.
//!
//! This crate provides:
//! - Saving uploads under a media root with collision-free names
//! - Deleting stored files
//! - Mapping stored paths to public URLs
//! - Path traversal protection for stored paths

pub mod error;
pub mod store;

pub use error::{MediaError, MediaResult};
pub use store::{sanitize_file_name, MediaConfig, MediaDir, MediaStore};
