//! Axum HTTP API server for Circle.
//!
//! This crate provides:
//! - Account registration and JWT authentication
//! - Friend requests, profiles, posts, likes and comments
//! - Rate limiting and security headers
//! - Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{FriendService, PostService, ProfileService, UserService};
pub use state::AppState;
