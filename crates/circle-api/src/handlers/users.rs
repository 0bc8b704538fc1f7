//! Registration, login and token handlers.

use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Serialize;

use circle_models::{LoginRequest, RefreshRequest, RegisterRequest};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::{is_multipart, read_upload, JsonBody, MultipartForm};
use crate::services::posts::Upload;
use crate::services::users::{AuthResponse, UserListing};
use crate::state::AppState;

#[derive(Serialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

async fn read_multipart_registration(
    mut multipart: Multipart,
) -> ApiResult<(RegisterRequest, Option<Upload>)> {
    let mut request = RegisterRequest::default();
    let mut picture = None;
    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("email") => request.email = field.text().await?,
            Some("username") => request.username = field.text().await?,
            Some("password") => request.password = field.text().await?,
            Some("password2") => request.password2 = field.text().await?,
            Some("bio") => request.bio = Some(field.text().await?),
            Some("gender") => request.gender = Some(field.text().await?),
            Some("date_of_birth") => {
                let text = field.text().await?;
                let text = text.trim();
                if !text.is_empty() {
                    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| {
                        ApiError::field(
                            "date_of_birth",
                            "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.",
                        )
                    })?;
                    request.date_of_birth = Some(date);
                }
            }
            Some("profile_picture") | Some("picture") => {
                if let Some(upload) = read_upload(field).await? {
                    picture = Some(upload);
                }
            }
            _ => {}
        }
    }
    Ok((request, picture))
}

/// Create an account from a JSON body, or a multipart form that may carry
/// a `profile_picture` file.
pub async fn register(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let (request, picture) = if is_multipart(&request) {
        let MultipartForm(multipart) = MultipartForm::from_request(request, &state).await?;
        read_multipart_registration(multipart).await?
    } else {
        let JsonBody(body) = JsonBody::<RegisterRequest>::from_request(request, &state).await?;
        (body, None)
    };

    let response = state.users.register(request, picture).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    Ok(Json(state.users.login(request).await?))
}

/// Trade a refresh token for a new access token.
pub async fn refresh_token(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RefreshRequest>,
) -> ApiResult<Json<AccessTokenResponse>> {
    let access = state.users.refresh(&request.refresh)?;
    Ok(Json(AccessTokenResponse { access }))
}

pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<UserListing>>> {
    Ok(Json(state.users.list(&user.0)?))
}
