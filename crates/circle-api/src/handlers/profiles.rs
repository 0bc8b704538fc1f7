//! Profile handlers.

use axum::extract::State;
use axum::Json;

use circle_models::ProfileUpdateRequest;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::{read_upload, JsonBody, MultipartForm, PathParam};
use crate::services::profiles::ProfileView;
use crate::state::AppState;

pub async fn get_my_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ProfileView>> {
    Ok(Json(state.profiles.get_own(&user.0)?))
}

/// Full update; fields left out are cleared.
pub async fn replace_my_profile(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(request): JsonBody<ProfileUpdateRequest>,
) -> ApiResult<Json<ProfileView>> {
    Ok(Json(state.profiles.update(&user.0, request, true)?))
}

/// Partial update.
pub async fn update_my_profile(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(request): JsonBody<ProfileUpdateRequest>,
) -> ApiResult<Json<ProfileView>> {
    Ok(Json(state.profiles.update(&user.0, request, false)?))
}

/// Upload a new profile picture from the `picture` multipart field.
pub async fn upload_picture(
    State(state): State<AppState>,
    user: AuthUser,
    MultipartForm(mut multipart): MultipartForm,
) -> ApiResult<Json<ProfileView>> {
    let mut picture = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("picture") {
            if let Some(upload) = read_upload(field).await? {
                picture = Some(upload);
            }
        }
    }

    let picture = picture.ok_or_else(|| ApiError::field("picture", "No file was submitted."))?;
    Ok(Json(state.profiles.set_picture(&user.0, picture).await?))
}

pub async fn get_profile(
    State(state): State<AppState>,
    _user: AuthUser,
    PathParam(username): PathParam<String>,
) -> ApiResult<Json<ProfileView>> {
    Ok(Json(state.profiles.get_by_username(&username)?))
}
