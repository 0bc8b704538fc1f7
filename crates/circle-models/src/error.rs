//! Model error types.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("\"{0}\" is not a valid visibility.")]
    InvalidVisibility(String),

    #[error("\"{0}\" is not a valid friend request status.")]
    InvalidStatus(String),

    #[error("\"{0}\" is not a valid gender.")]
    InvalidGender(String),

    #[error("\"{0}\" is not a valid media type.")]
    InvalidMediaType(String),
}
