//! Application state.

use std::sync::Arc;

use circle_db::Database;
use circle_media::MediaStore;

use crate::auth::JwtManager;
use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::services::{FriendService, PostService, ProfileService, UserService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub db: Arc<Database>,
    pub media: Arc<MediaStore>,
    pub jwt: Arc<JwtManager>,
    pub users: UserService,
    pub profiles: ProfileService,
    pub friends: FriendService,
    pub posts: PostService,
}

impl AppState {
    /// Open the database and media root named by `config`.
    pub fn new(config: ApiConfig) -> ApiResult<Self> {
        let db = Database::open(&config.database_path)?;
        let media = MediaStore::new(config.media.clone())?;
        Self::from_parts(config, db, media)
    }

    /// Build state around an already opened database and media store.
    pub fn from_parts(config: ApiConfig, db: Database, media: MediaStore) -> ApiResult<Self> {
        let jwt = JwtManager::new(
            config.signing_secret()?,
            config.access_token_ttl,
            config.refresh_token_ttl,
        );

        let db = Arc::new(db);
        let media = Arc::new(media);
        let jwt = Arc::new(jwt);

        Ok(Self {
            users: UserService::new(Arc::clone(&db), Arc::clone(&media), Arc::clone(&jwt)),
            profiles: ProfileService::new(Arc::clone(&db), Arc::clone(&media)),
            friends: FriendService::new(Arc::clone(&db), Arc::clone(&media)),
            posts: PostService::new(Arc::clone(&db), Arc::clone(&media)),
            config,
            db,
            media,
            jwt,
        })
    }
}
