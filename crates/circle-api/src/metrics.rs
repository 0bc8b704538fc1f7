//! Prometheus metrics for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Install the Prometheus recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "circle_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "circle_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "circle_http_requests_in_flight";

    // Domain metrics
    pub const USERS_REGISTERED_TOTAL: &str = "circle_users_registered_total";
    pub const FRIEND_REQUESTS_TOTAL: &str = "circle_friend_requests_total";
    pub const POSTS_CREATED_TOTAL: &str = "circle_posts_created_total";
    pub const MEDIA_UPLOADED_TOTAL: &str = "circle_media_uploaded_total";
    pub const LIKES_TOTAL: &str = "circle_likes_total";
    pub const COMMENTS_TOTAL: &str = "circle_comments_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "circle_rate_limit_hits_total";
}

/// Record an HTTP request. `path` is an already sanitized label.
pub fn record_http_request(method: &str, path: String, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_user_registered() {
    counter!(names::USERS_REGISTERED_TOTAL).increment(1);
}

/// Record a friend request transition (`sent`, `accepted`, ...).
pub fn record_friend_request(action: &str) {
    let labels = [("action", action.to_string())];
    counter!(names::FRIEND_REQUESTS_TOTAL, &labels).increment(1);
}

/// Record a new post and the number of files attached to it.
pub fn record_post_created(media_count: usize) {
    counter!(names::POSTS_CREATED_TOTAL).increment(1);
    counter!(names::MEDIA_UPLOADED_TOTAL).increment(media_count as u64);
}

pub fn record_like(action: &str) {
    let labels = [("action", action.to_string())];
    counter!(names::LIKES_TOTAL, &labels).increment(1);
}

pub fn record_comment() {
    counter!(names::COMMENTS_TOTAL).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint, ""))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

struct PathPatterns {
    numeric: Regex,
    named: Regex,
}

fn patterns() -> &'static PathPatterns {
    static PATTERNS: OnceLock<PathPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| PathPatterns {
        numeric: Regex::new(r"/[0-9]+(/|$)").expect("valid regex"),
        named: Regex::new(r"/(profiles|friends/send|posts/user|friends)/([^/]+)(/|$)")
            .expect("valid regex"),
    })
}

/// Sanitize path for metrics labels (collapse ids and usernames). Files
/// under `media_prefix` share one label.
fn sanitize_path(path: &str, media_prefix: &str) -> String {
    let media_prefix = media_prefix.trim_end_matches('/');
    if media_prefix.starts_with('/') && media_prefix.len() > 1 {
        let is_media = path
            .strip_prefix(media_prefix)
            .is_some_and(|rest| rest.starts_with('/'));
        if is_media {
            return format!("{}/:file", media_prefix);
        }
    }

    let patterns = patterns();
    let path = patterns.numeric.replace_all(path, "/:id$1");
    let path = patterns.named.replace_all(&path, |caps: &regex_lite::Captures<'_>| {
        let (prefix, name) = (&caps[1], &caps[2]);
        let fixed = (prefix == "profiles" && name == "me") || (prefix == "friends" && name == "requests");
        if fixed {
            caps[0].to_string()
        } else {
            format!("/{}/:username{}", prefix, &caps[3])
        }
    });
    path.to_string()
}

/// Metrics middleware for HTTP requests. The state is the media URL prefix.
pub async fn metrics_middleware(
    State(media_prefix): State<Arc<str>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, sanitize_path(&path, &media_prefix), status, duration);

    response
}
