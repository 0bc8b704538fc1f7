//! Profile model.

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Public-facing profile, one per user.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Profile {
    pub user_id: UserId,
    pub bio: Option<String>,
    /// Relative media path of the profile picture
    pub profile_picture: Option<String>,
    pub location: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Empty profile for a freshly registered user.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            bio: None,
            profile_picture: None,
            location: None,
            date_of_birth: None,
            created_at: Utc::now(),
        }
    }
}
