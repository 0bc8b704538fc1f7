//! Account registration, login and token refresh.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use circle_db::queries::{profiles, users};
use circle_db::{Database, NewUser};
use circle_media::{MediaDir, MediaStore};
use circle_models::{
    FieldErrors, Gender, LoginRequest, MediaType, RegisterRequest, User, UserId,
};

use crate::auth::{hash_password, verify_password, JwtManager, TokenPair, TokenType};
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::posts::Upload;

/// Public view of an account.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub bio: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    /// Media URL
    pub profile_picture: Option<String>,
    pub is_private_account: bool,
}

impl UserSummary {
    pub fn new(user: &User, media: &MediaStore) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            bio: user.bio.clone(),
            date_of_birth: user.date_of_birth,
            gender: user.gender,
            profile_picture: user.profile_picture.as_deref().map(|p| media.url(p)),
            is_private_account: user.is_private_account,
        }
    }
}

/// Staff view of an account.
#[derive(Debug, Clone, Serialize)]
pub struct UserListing {
    #[serde(flatten)]
    pub summary: UserSummary,
    pub is_staff: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A user together with a fresh token pair.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: UserSummary,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Account service.
#[derive(Clone)]
pub struct UserService {
    db: Arc<Database>,
    media: Arc<MediaStore>,
    jwt: Arc<JwtManager>,
}

impl UserService {
    pub fn new(db: Arc<Database>, media: Arc<MediaStore>, jwt: Arc<JwtManager>) -> Self {
        Self { db, media, jwt }
    }

    /// Create an account and its profile, then log it in. An optional
    /// picture becomes the profile picture.
    pub async fn register(
        &self,
        request: RegisterRequest,
        picture: Option<Upload>,
    ) -> ApiResult<AuthResponse> {
        let mut errors = FieldErrors::new();
        if picture.as_ref().is_some_and(|p| p.media_type() != Some(MediaType::Image)) {
            errors.add("profile_picture", "Only image files are allowed.");
        }
        let valid = match request.validated() {
            Ok(valid) => {
                errors.into_result()?;
                valid
            }
            Err(e) => {
                errors.merge(e);
                return Err(errors.into());
            }
        };

        let password = valid.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| ApiError::internal(format!("Password hashing task failed: {}", e)))??;

        let new = NewUser {
            email: valid.email,
            username: valid.username,
            password_hash,
            bio: valid.bio,
            date_of_birth: valid.date_of_birth,
            gender: valid.gender,
            is_staff: false,
        };

        let path = match &picture {
            Some(upload) => Some(
                self.media
                    .save(MediaDir::ProfilePictures, &upload.file_name, &upload.bytes)
                    .await?,
            ),
            None => None,
        };

        let created = self.db.with_tx(|tx| -> ApiResult<User> {
            let mut errors = FieldErrors::new();
            if users::email_exists(tx, &new.email)? {
                errors.add("email", "user with this email already exists.");
            }
            if users::username_exists(tx, &new.username)? {
                errors.add("username", "A user with that username already exists.");
            }
            errors.into_result()?;

            let mut user = users::insert_user(tx, &new).map_err(|e| {
                if e.is_conflict() {
                    ApiError::field("username", "A user with that username already exists.")
                } else {
                    ApiError::from(e)
                }
            })?;
            if let Some(path) = &path {
                profiles::set_profile_picture(tx, user.id, Some(path.as_str()))?;
                users::set_user_picture(tx, user.id, Some(path.as_str()))?;
                user.profile_picture = Some(path.clone());
            }
            Ok(user)
        });

        let user = match created {
            Ok(user) => user,
            Err(e) => {
                if let Some(path) = path {
                    self.media.delete_all(&[path]).await;
                }
                return Err(e);
            }
        };

        info!(user_id = %user.id, username = %user.username, "User registered");
        metrics::record_user_registered();

        Ok(AuthResponse {
            user: UserSummary::new(&user, &self.media),
            tokens: self.jwt.issue_pair(user.id)?,
        })
    }

    /// Exchange e-mail and password for a token pair.
    pub async fn login(&self, request: LoginRequest) -> ApiResult<AuthResponse> {
        request.check()?;

        let user = self
            .db
            .with_conn(|conn| users::get_user_by_email(conn, &request.email))?
            .filter(|user| user.is_active)
            .ok_or_else(|| ApiError::from(LoginRequest::invalid_credentials()))?;

        let password = request.password;
        let stored = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| ApiError::internal(format!("Password check task failed: {}", e)))?;
        if !matches {
            warn!(user_id = %user.id, "Login failed");
            return Err(LoginRequest::invalid_credentials().into());
        }

        info!(user_id = %user.id, "User logged in");
        Ok(AuthResponse {
            user: UserSummary::new(&user, &self.media),
            tokens: self.jwt.issue_pair(user.id)?,
        })
    }

    /// New access token for a valid refresh token.
    pub fn refresh(&self, refresh: &str) -> ApiResult<String> {
        let claims = self.jwt.verify(refresh.trim(), TokenType::Refresh)?;
        let user_id = claims.user_id()?;
        let active = self
            .db
            .with_conn(|conn| users::get_user(conn, user_id))?
            .is_some_and(|user| user.is_active);
        if !active {
            return Err(ApiError::unauthorized("User not found or inactive"));
        }
        self.jwt.access_token(user_id)
    }

    /// Every account; staff only.
    pub fn list(&self, requester: &User) -> ApiResult<Vec<UserListing>> {
        if !requester.is_staff {
            return Err(ApiError::forbidden(
                "You do not have permission to perform this action.",
            ));
        }
        let all = self.db.with_conn(users::list_users)?;
        Ok(all
            .iter()
            .map(|user| UserListing {
                summary: UserSummary::new(user, &self.media),
                is_staff: user.is_staff,
                is_active: user.is_active,
                created_at: user.created_at,
            })
            .collect())
    }
}
