//! Like and comment handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use circle_models::{CommentId, CommentRequest, PostId};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::handlers::{JsonBody, PathParam};
use crate::services::posts::{CommentView, LikeStatus};
use crate::state::AppState;

pub async fn like_post(
    State(state): State<AppState>,
    user: AuthUser,
    PathParam(id): PathParam<PostId>,
) -> ApiResult<Json<LikeStatus>> {
    Ok(Json(state.posts.like(&user.0, id)?))
}

pub async fn unlike_post(
    State(state): State<AppState>,
    user: AuthUser,
    PathParam(id): PathParam<PostId>,
) -> ApiResult<Json<LikeStatus>> {
    Ok(Json(state.posts.unlike(&user.0, id)?))
}

pub async fn list_comments(
    State(state): State<AppState>,
    user: AuthUser,
    PathParam(id): PathParam<PostId>,
) -> ApiResult<Json<Vec<CommentView>>> {
    Ok(Json(state.posts.comments(&user.0, id)?))
}

pub async fn add_comment(
    State(state): State<AppState>,
    user: AuthUser,
    PathParam(id): PathParam<PostId>,
    JsonBody(request): JsonBody<CommentRequest>,
) -> ApiResult<(StatusCode, Json<CommentView>)> {
    let comment = state.posts.add_comment(&user.0, id, request)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    user: AuthUser,
    PathParam(id): PathParam<CommentId>,
) -> ApiResult<StatusCode> {
    state.posts.delete_comment(&user.0, id)?;
    Ok(StatusCode::NO_CONTENT)
}
