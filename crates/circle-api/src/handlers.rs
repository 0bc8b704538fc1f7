//! Request handlers.

use axum::body::Bytes;
use axum::extract::multipart::Field;
use axum::extract::{FromRequest, FromRequestParts, Multipart, Request};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::services::posts::{Page, Upload};

pub mod engagement;
pub mod friends;
pub mod health;
pub mod posts;
pub mod profiles;
pub mod users;

pub use health::*;

/// `Json` whose rejections use the API error body.
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

impl<T: Serialize> IntoResponse for JsonBody<T> {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}

/// `Path` with API error rejections.
#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathParam<T>(pub T);

/// `Query` with API error rejections.
#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

/// `Multipart` with API error rejections.
pub struct MultipartForm(pub Multipart);

#[axum::async_trait]
impl<S> FromRequest<S> for MultipartForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(Multipart::from_request(request, state).await?))
    }
}

/// Whether the request carries a multipart form.
pub(crate) fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

/// `{"detail": ...}` acknowledgement.
#[derive(Debug, Serialize)]
pub struct Detail {
    pub detail: &'static str,
}

impl Detail {
    pub fn new(detail: &'static str) -> Json<Self> {
        Json(Self { detail })
    }
}

/// `?limit=&offset=` query.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl From<PageQuery> for Page {
    fn from(query: PageQuery) -> Self {
        Page::new(query.limit, query.offset)
    }
}

/// Buffer a multipart file field. A file input left empty arrives with a
/// blank file name and yields `None`.
pub(crate) async fn read_upload(field: Field<'_>) -> ApiResult<Option<Upload>> {
    let file_name = match field.file_name() {
        Some(name) if name.trim().is_empty() => return Ok(None),
        Some(name) => name.to_string(),
        None => "upload".to_string(),
    };
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes: Bytes = field.bytes().await?;
    Ok(Some(Upload {
        file_name,
        content_type,
        bytes,
    }))
}
