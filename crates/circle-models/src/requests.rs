//! Request payloads and their validation.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use validator::Validate;

use crate::engagement::MAX_COMMENT_LENGTH;
use crate::post::{Visibility, MAX_POST_CONTENT_LENGTH};
use crate::user::Gender;
use crate::validation::{normalize_text, password_problems, FieldErrors, NON_FIELD_ERRORS};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Account registration.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(custom(function = "crate::validation::validate_username"))]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password2: String,
    #[serde(default)]
    #[validate(length(max = 500, message = "Ensure this field has no more than 500 characters."))]
    pub bio: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
}

/// Registration input after validation.
#[derive(Debug, Clone)]
pub struct ValidatedRegistration {
    pub email: String,
    pub username: String,
    pub password: String,
    pub bio: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
}

impl RegisterRequest {
    /// Validate every field and normalize the payload.
    pub fn validated(self) -> Result<ValidatedRegistration, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("email", &self.email);
        errors.require("username", &self.username);
        errors.require("password", &self.password);
        errors.require("password2", &self.password2);

        if let Err(e) = self.validate() {
            let mut field_errors = FieldErrors::from(e);
            // Blank fields already carry "required"; don't pile format errors on top
            for field in ["email", "username"] {
                if errors.get(field).is_some() {
                    field_errors = strip_field(field_errors, field);
                }
            }
            errors.merge(field_errors);
        }

        if !self.password.is_empty() && self.password != self.password2 {
            errors.add("password", "Password fields didn't match.");
        } else if !self.password.is_empty() {
            for problem in password_problems(&self.password, &self.username, &self.email) {
                errors.add("password", problem);
            }
        }

        let gender = match Gender::parse_optional(self.gender.as_deref()) {
            Ok(g) => g,
            Err(e) => {
                errors.add("gender", e.to_string());
                None
            }
        };

        errors.into_result()?;

        Ok(ValidatedRegistration {
            email: self.email.trim().to_lowercase(),
            username: self.username,
            password: self.password,
            bio: self.bio.unwrap_or_default(),
            date_of_birth: self.date_of_birth,
            gender,
        })
    }
}

fn strip_field(errors: FieldErrors, field: &str) -> FieldErrors {
    let mut out = FieldErrors::new();
    for name in errors.fields().filter(|f| *f != field) {
        for message in errors.get(name).unwrap_or_default() {
            out.add(name, message.clone());
        }
    }
    out
}

/// Login with e-mail and password.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    pub fn check(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("email", &self.email);
        errors.require("password", &self.password);
        errors.into_result()
    }

    /// Error returned for unknown e-mail, wrong password or inactive account alike.
    pub fn invalid_credentials() -> FieldErrors {
        FieldErrors::single(NON_FIELD_ERRORS, "Invalid credentials")
    }
}

/// Exchange a refresh token for a new access token.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Profile update. For `PUT` absent fields are cleared, for `PATCH` they are kept.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdateRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub date_of_birth: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub is_private_account: Option<bool>,
}

impl ProfileUpdateRequest {
    pub fn check(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(Some(bio)) = &self.bio {
            if bio.chars().count() > 500 {
                errors.add("bio", "Ensure this field has no more than 500 characters.");
            }
        }
        if let Some(Some(location)) = &self.location {
            if location.chars().count() > 100 {
                errors.add("location", "Ensure this field has no more than 100 characters.");
            }
        }
        if let Some(Some(dob)) = &self.date_of_birth {
            if *dob > chrono::Utc::now().date_naive() {
                errors.add("date_of_birth", "Date of birth cannot be in the future.");
            }
        }
        errors.into_result()
    }

    /// Turn a partial update into a full replacement: absent means cleared.
    pub fn into_full(self) -> Self {
        Self {
            bio: Some(self.bio.flatten()),
            location: Some(self.location.flatten()),
            date_of_birth: Some(self.date_of_birth.flatten()),
            is_private_account: self.is_private_account,
        }
    }
}

/// Edit of an existing post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdateRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub content: Option<Option<String>>,
    #[serde(default)]
    pub visibility: Option<String>,
}

impl PostUpdateRequest {
    /// Validate and return the normalized content change and visibility.
    #[allow(clippy::type_complexity)]
    pub fn validated(self) -> Result<(Option<Option<String>>, Option<Visibility>), FieldErrors> {
        let mut errors = FieldErrors::new();
        let visibility = match self.visibility.as_deref().map(str::parse::<Visibility>) {
            None => None,
            Some(Ok(v)) => Some(v),
            Some(Err(e)) => {
                errors.add("visibility", e.to_string());
                None
            }
        };
        let content = self.content.map(normalize_text);
        if let Some(Some(text)) = &content {
            if text.chars().count() > MAX_POST_CONTENT_LENGTH {
                errors.add("content", "Ensure this field has no more than 10000 characters.");
            }
        }
        errors.into_result()?;
        Ok((content, visibility))
    }
}

/// Parse post fields shared by the JSON and multipart create paths.
pub fn parse_post_fields(
    content: Option<String>,
    visibility: Option<&str>,
) -> Result<(Option<String>, Visibility), FieldErrors> {
    let mut errors = FieldErrors::new();
    let content = normalize_text(content);
    if let Some(text) = &content {
        if text.chars().count() > MAX_POST_CONTENT_LENGTH {
            errors.add("content", "Ensure this field has no more than 10000 characters.");
        }
    }
    let visibility = match visibility.map(str::trim).filter(|v| !v.is_empty()) {
        None => Visibility::default(),
        Some(v) => match v.parse::<Visibility>() {
            Ok(v) => v,
            Err(e) => {
                errors.add("visibility", e.to_string());
                Visibility::default()
            }
        },
    };
    errors.into_result()?;
    Ok((content, visibility))
}

/// New comment on a post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub content: String,
}

impl CommentRequest {
    pub fn validated(self) -> Result<String, FieldErrors> {
        let content = self.content.trim().to_string();
        if content.is_empty() {
            return Err(FieldErrors::single("content", "This field may not be blank."));
        }
        if content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(FieldErrors::single(
                "content",
                "Ensure this field has no more than 2000 characters.",
            ));
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> RegisterRequest {
        RegisterRequest {
            email: "Ada@Example.com".to_string(),
            username: "ada".to_string(),
            password: "analytical-engine".to_string(),
            password2: "analytical-engine".to_string(),
            bio: None,
            date_of_birth: None,
            gender: Some("F".to_string()),
        }
    }

    #[test]
    fn test_valid_registration_is_normalized() {
        let valid = registration().validated().unwrap();
        assert_eq!(valid.email, "ada@example.com");
        assert_eq!(valid.gender, Some(Gender::Female));
        assert_eq!(valid.bio, "");
    }

    #[test]
    fn test_registration_password_mismatch() {
        let mut request = registration();
        request.password2 = "something-else".to_string();
        let errors = request.validated().unwrap_err();
        assert_eq!(errors.get("password").unwrap(), ["Password fields didn't match."]);
    }

    #[test]
    fn test_registration_missing_fields() {
        let errors = RegisterRequest::default().validated().unwrap_err();
        assert_eq!(errors.get("email").unwrap(), ["This field is required."]);
        assert_eq!(errors.get("username").unwrap(), ["This field is required."]);
        assert!(errors.get("password").is_some());
        assert!(errors.get("password2").is_some());
    }

    #[test]
    fn test_registration_bad_email_and_gender() {
        let mut request = registration();
        request.email = "not-an-email".to_string();
        request.gender = Some("Z".to_string());
        let errors = request.validated().unwrap_err();
        assert_eq!(errors.get("email").unwrap(), ["Enter a valid email address."]);
        assert!(errors.get("gender").is_some());
    }

    #[test]
    fn test_profile_update_distinguishes_null_and_absent() {
        let patch: ProfileUpdateRequest =
            serde_json::from_str(r#"{"bio": null, "location": "Paris"}"#).unwrap();
        assert_eq!(patch.bio, Some(None));
        assert_eq!(patch.location, Some(Some("Paris".to_string())));
        assert_eq!(patch.date_of_birth, None);

        let full = patch.into_full();
        assert_eq!(full.date_of_birth, Some(None));
    }

    #[test]
    fn test_profile_update_limits() {
        let patch = ProfileUpdateRequest {
            location: Some(Some("x".repeat(101))),
            ..Default::default()
        };
        assert!(patch.check().unwrap_err().get("location").is_some());
    }

    #[test]
    fn test_post_fields() {
        let (content, visibility) = parse_post_fields(Some(" hi ".into()), None).unwrap();
        assert_eq!(content.as_deref(), Some("hi"));
        assert_eq!(visibility, Visibility::Friends);

        let errors = parse_post_fields(None, Some("SECRET")).unwrap_err();
        assert!(errors.get("visibility").is_some());
    }

    #[test]
    fn test_post_update() {
        let update: PostUpdateRequest =
            serde_json::from_str(r#"{"visibility": "PUBLIC"}"#).unwrap();
        let (content, visibility) = update.validated().unwrap();
        assert_eq!(content, None);
        assert_eq!(visibility, Some(Visibility::Public));

        let update: PostUpdateRequest = serde_json::from_str(r#"{"content": "  "}"#).unwrap();
        let (content, _) = update.validated().unwrap();
        assert_eq!(content, Some(None));
    }

    #[test]
    fn test_comment_validation() {
        assert_eq!(
            CommentRequest { content: " nice ".into() }.validated().unwrap(),
            "nice"
        );
        assert!(CommentRequest { content: "   ".into() }.validated().is_err());
        assert!(CommentRequest { content: "x".repeat(2001) }.validated().is_err());
    }
}
