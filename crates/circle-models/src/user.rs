//! User account models.

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;
use crate::ids::UserId;

/// Self-declared gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "O")]
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Other => "O",
        }
    }

    /// Parse an optional form value; blank means "not specified".
    pub fn parse_optional(value: Option<&str>) -> Result<Option<Self>, ModelError> {
        match value.map(str::trim) {
            None | Some("") => Ok(None),
            Some(v) => v.parse().map(Some),
        }
    }
}

impl FromStr for Gender {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M" => Ok(Gender::Male),
            "F" => Ok(Gender::Female),
            "O" => Ok(Gender::Other),
            other => Err(ModelError::InvalidGender(other.to_string())),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered account.
///
/// The e-mail address is the login identifier; the username is the public
/// handle used in URLs.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(default)]
    pub bio: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    /// Relative media path of the account picture
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub is_private_account: bool,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl User {
    /// Whether `other` is the same account.
    pub fn is(&self, other: UserId) -> bool {
        self.id == other
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_parse() {
        assert_eq!("M".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!(Gender::parse_optional(Some("")).unwrap(), None);
        assert_eq!(Gender::parse_optional(None).unwrap(), None);
        assert_eq!(Gender::parse_optional(Some("O")).unwrap(), Some(Gender::Other));
        assert!(Gender::parse_optional(Some("X")).is_err());
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User {
            id: UserId(1),
            email: "ada@example.com".to_string(),
            username: "ada".to_string(),
            password_hash: "secret-hash".to_string(),
            bio: String::new(),
            date_of_birth: None,
            gender: Some(Gender::Female),
            profile_picture: None,
            is_private_account: false,
            is_staff: false,
            is_active: true,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["gender"], "F");
    }
}
