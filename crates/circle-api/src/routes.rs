//! API routes.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::engagement::{add_comment, delete_comment, like_post, list_comments, unlike_post};
use crate::handlers::friends::{
    accept_request, cancel_request, incoming_requests, list_friends, outgoing_requests,
    reject_request, send_request, unfriend,
};
use crate::handlers::posts::{create_post, delete_post, feed, get_post, update_post, user_posts};
use crate::handlers::profiles::{
    get_my_profile, get_profile, replace_my_profile, update_my_profile, upload_picture,
};
use crate::handlers::users::{list_users, login, refresh_token, register};
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let user_routes = Router::new()
        .route("/users/register/", post(register))
        .route("/users/login/", post(login))
        .route("/users/token/refresh/", post(refresh_token))
        .route("/users/list/", get(list_users));

    let profile_routes = Router::new()
        .route(
            "/profiles/me/",
            get(get_my_profile).put(replace_my_profile).patch(update_my_profile),
        )
        .route("/profiles/me/picture/", put(upload_picture))
        .route("/profiles/:username/", get(get_profile));

    let friend_routes = Router::new()
        .route("/friends/", get(list_friends))
        .route("/friends/send/:username/", post(send_request))
        .route("/friends/requests/incoming/", get(incoming_requests))
        .route("/friends/requests/outgoing/", get(outgoing_requests))
        .route("/friends/requests/:id/", delete(cancel_request))
        .route("/friends/requests/:id/accept/", post(accept_request))
        .route("/friends/requests/:id/reject/", post(reject_request))
        .route("/friends/:username/", delete(unfriend));

    let post_routes = Router::new()
        .route("/posts/create/", post(create_post))
        .route("/posts/feed/", get(feed))
        .route("/posts/user/:username/", get(user_posts))
        .route("/posts/:id/", get(get_post).patch(update_post).delete(delete_post))
        // Likes and comments
        .route("/posts/:id/like/", post(like_post).delete(unlike_post))
        .route("/posts/:id/comments/", get(list_comments).post(add_comment))
        .route("/posts/comments/:id/", delete(delete_comment));

    let rate_limiter = Arc::new(RateLimiterCache::new(
        state.config.rate_limit_rps,
        state.config.rate_limit_burst,
    ));

    let api_routes = Router::new()
        .merge(user_routes)
        .merge(profile_routes)
        .merge(friend_routes)
        .merge(post_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    let mut router = Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes);

    // Uploaded files, when they are served from a local path
    let media_path = state.media.url_prefix().trim_end_matches('/');
    if media_path.starts_with('/') && media_path.len() > 1 {
        router = router.nest_service(media_path, ServeDir::new(state.media.root()));
    }
    let media_prefix: Arc<str> = Arc::from(media_path);

    router
        // Uploads are bounded by the body limit below instead of axum's 2MB default
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(middleware::from_fn_with_state(media_prefix, metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
