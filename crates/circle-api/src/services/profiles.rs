//! Profile reads, edits and picture uploads.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use circle_db::queries::{profiles, users};
use circle_db::{Database, ProfileChanges};
use circle_media::{MediaDir, MediaStore};
use circle_models::{MediaType, Profile, ProfileUpdateRequest, User};

use crate::error::{ApiError, ApiResult};
use crate::services::posts::Upload;

/// Serialized profile.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    /// Media URL
    pub profile_picture: Option<String>,
    pub location: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub is_private_account: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ProfileService {
    db: Arc<Database>,
    media: Arc<MediaStore>,
}

impl ProfileService {
    pub fn new(db: Arc<Database>, media: Arc<MediaStore>) -> Self {
        Self { db, media }
    }

    fn view(&self, user: &User, profile: Profile) -> ProfileView {
        ProfileView {
            username: user.username.clone(),
            email: user.email.clone(),
            bio: profile.bio,
            profile_picture: profile.profile_picture.as_deref().map(|p| self.media.url(p)),
            location: profile.location,
            date_of_birth: profile.date_of_birth,
            is_private_account: user.is_private_account,
            created_at: profile.created_at,
        }
    }

    fn load(&self, user: &User) -> ApiResult<ProfileView> {
        let profile = self
            .db
            .with_conn(|conn| profiles::get_profile(conn, user.id))?
            .unwrap_or_else(|| Profile::empty(user.id));
        Ok(self.view(user, profile))
    }

    pub fn get_own(&self, user: &User) -> ApiResult<ProfileView> {
        self.load(user)
    }

    pub fn get_by_username(&self, username: &str) -> ApiResult<ProfileView> {
        let user = self
            .db
            .with_conn(|conn| users::get_user_by_username(conn, username))?
            .ok_or_else(|| ApiError::not_found("User not found."))?;
        self.load(&user)
    }

    /// Apply an update. With `replace` absent fields are cleared (PUT),
    /// otherwise they are left alone (PATCH).
    pub fn update(
        &self,
        user: &User,
        request: ProfileUpdateRequest,
        replace: bool,
    ) -> ApiResult<ProfileView> {
        request.check()?;
        let request = if replace { request.into_full() } else { request };

        let changes = ProfileChanges {
            bio: request.bio,
            location: request.location,
            date_of_birth: request.date_of_birth,
        };
        let private = request.is_private_account;

        let (user, profile) = self.db.with_tx(|tx| -> ApiResult<(User, Profile)> {
            let profile = profiles::update_profile(tx, user.id, &changes)?;
            if let Some(private) = private {
                users::set_private_account(tx, user.id, private)?;
            }
            let user = users::get_user(tx, user.id)?
                .ok_or_else(|| ApiError::not_found("User not found."))?;
            Ok((user, profile))
        })?;

        info!(user_id = %user.id, "Profile updated");
        Ok(self.view(&user, profile))
    }

    /// Replace the profile picture with an uploaded image.
    pub async fn set_picture(&self, user: &User, upload: Upload) -> ApiResult<ProfileView> {
        if upload.media_type() != Some(MediaType::Image) {
            return Err(ApiError::field("picture", "Only image files are allowed."));
        }

        let path = self
            .media
            .save(MediaDir::ProfilePictures, &upload.file_name, &upload.bytes)
            .await?;

        let stored = self.db.with_tx(|tx| -> ApiResult<Option<String>> {
            let previous = profiles::set_profile_picture(tx, user.id, Some(&path))?;
            users::set_user_picture(tx, user.id, Some(&path))?;
            Ok(previous)
        });

        let previous = match stored {
            Ok(previous) => previous,
            Err(e) => {
                self.media.delete_all(&[path]).await;
                return Err(e);
            }
        };
        if let Some(previous) = previous.filter(|p| *p != path) {
            self.media.delete_all(&[previous]).await;
        }

        info!(user_id = %user.id, path = %path, "Profile picture updated");
        self.get_own(user)
    }
}
