//! Friend request and friendship handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use circle_models::FriendRequestId;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::handlers::{Detail, PathParam};
use crate::services::friends::{FriendView, IncomingRequest, OutgoingRequest};
use crate::state::AppState;

pub async fn send_request(
    State(state): State<AppState>,
    user: AuthUser,
    PathParam(username): PathParam<String>,
) -> ApiResult<(StatusCode, Json<Detail>)> {
    state.friends.send(&user.0, &username)?;
    Ok((StatusCode::CREATED, Detail::new("Friend request sent successfully.")))
}

pub async fn incoming_requests(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<IncomingRequest>>> {
    Ok(Json(state.friends.incoming(&user.0)?))
}

pub async fn outgoing_requests(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<OutgoingRequest>>> {
    Ok(Json(state.friends.outgoing(&user.0)?))
}

pub async fn accept_request(
    State(state): State<AppState>,
    user: AuthUser,
    PathParam(id): PathParam<FriendRequestId>,
) -> ApiResult<Json<Detail>> {
    state.friends.accept(&user.0, id)?;
    Ok(Detail::new("Friend request accepted."))
}

pub async fn reject_request(
    State(state): State<AppState>,
    user: AuthUser,
    PathParam(id): PathParam<FriendRequestId>,
) -> ApiResult<Json<Detail>> {
    state.friends.reject(&user.0, id)?;
    Ok(Detail::new("Friend request rejected."))
}

/// Withdraw a pending request the caller sent.
pub async fn cancel_request(
    State(state): State<AppState>,
    user: AuthUser,
    PathParam(id): PathParam<FriendRequestId>,
) -> ApiResult<StatusCode> {
    state.friends.cancel(&user.0, id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_friends(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<FriendView>>> {
    Ok(Json(state.friends.list(&user.0)?))
}

pub async fn unfriend(
    State(state): State<AppState>,
    user: AuthUser,
    PathParam(username): PathParam<String>,
) -> ApiResult<StatusCode> {
    state.friends.unfriend(&user.0, &username)?;
    Ok(StatusCode::NO_CONTENT)
}
