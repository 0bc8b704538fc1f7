//! Post handlers.

use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use circle_models::{PostId, PostUpdateRequest};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::handlers::{
    is_multipart, read_upload, JsonBody, MultipartForm, PageQuery, PathParam, QueryParams,
};
use crate::services::posts::{NewPost, PostView};
use crate::state::AppState;

/// JSON form of a new post (text only).
#[derive(Debug, Default, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
}

async fn read_multipart_post(mut multipart: Multipart) -> ApiResult<NewPost> {
    let mut new = NewPost::default();
    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("content") => new.content = Some(field.text().await?),
            Some("visibility") => new.visibility = Some(field.text().await?),
            Some("media") => {
                if let Some(upload) = read_upload(field).await? {
                    new.uploads.push(upload);
                }
            }
            _ => {}
        }
    }
    Ok(new)
}

/// Create a post from a multipart form (with `media` files) or a JSON body.
pub async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    request: Request,
) -> ApiResult<(StatusCode, Json<PostView>)> {
    let new = if is_multipart(&request) {
        let MultipartForm(multipart) = MultipartForm::from_request(request, &state).await?;
        read_multipart_post(multipart).await?
    } else {
        let JsonBody(body) = JsonBody::<CreatePostRequest>::from_request(request, &state).await?;
        NewPost {
            content: body.content,
            visibility: body.visibility,
            uploads: Vec::new(),
        }
    };

    let post = state.posts.create(&user.0, new).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn feed(
    State(state): State<AppState>,
    user: AuthUser,
    QueryParams(page): QueryParams<PageQuery>,
) -> ApiResult<Json<Vec<PostView>>> {
    Ok(Json(state.posts.feed(&user.0, page.into())?))
}

pub async fn get_post(
    State(state): State<AppState>,
    user: AuthUser,
    PathParam(id): PathParam<PostId>,
) -> ApiResult<Json<PostView>> {
    Ok(Json(state.posts.get(&user.0, id)?))
}

pub async fn update_post(
    State(state): State<AppState>,
    user: AuthUser,
    PathParam(id): PathParam<PostId>,
    JsonBody(request): JsonBody<PostUpdateRequest>,
) -> ApiResult<Json<PostView>> {
    Ok(Json(state.posts.update(&user.0, id, request)?))
}

pub async fn delete_post(
    State(state): State<AppState>,
    user: AuthUser,
    PathParam(id): PathParam<PostId>,
) -> ApiResult<StatusCode> {
    state.posts.delete(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// A user's posts, filtered by what the caller may see.
pub async fn user_posts(
    State(state): State<AppState>,
    user: AuthUser,
    PathParam(username): PathParam<String>,
    QueryParams(page): QueryParams<PageQuery>,
) -> ApiResult<Json<Vec<PostView>>> {
    Ok(Json(state.posts.by_author(&user.0, &username, page.into())?))
}
