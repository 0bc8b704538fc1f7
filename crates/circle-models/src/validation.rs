//! Input validation helpers shared by request payloads.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Serialize;
use validator::{ValidationError, ValidationErrors};

/// Field key used for errors that are not tied to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 150;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Passwords rejected outright.
const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "12345678", "123456789", "1234567890",
    "qwerty123", "qwertyuiop", "iloveyou", "sunshine", "football", "baseball",
    "welcome1", "letmein1", "abc12345", "11111111", "00000000", "trustno1",
    "passw0rd", "superman", "starwars", "princess", "dragon12", "monkey12",
];

/// Per-field validation messages, serialized as `{field: [messages]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a single-field error.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Require a non-blank value.
    pub fn require(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "This field is required.");
        }
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(())` when no errors were collected.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// First message overall, used as a one-line summary.
    pub fn summary(&self) -> String {
        self.0
            .iter()
            .next()
            .and_then(|(field, messages)| messages.first().map(|m| format!("{}: {}", field, m)))
            .unwrap_or_else(|| "Invalid input".to_string())
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({}).", error.code));
                out.add(field.to_string(), message);
            }
        }
        out
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.summary())
    }
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Usernames: letters, digits and `@ . + - _`.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let valid = !username.is_empty()
        && username.chars().count() <= MAX_USERNAME_LENGTH
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(error(
            "invalid_username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ))
    }
}

/// Password strength checks; returns every failed rule.
pub fn password_problems(password: &str, username: &str, email: &str) -> Vec<&'static str> {
    let mut problems = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push("This password is too short. It must contain at least 8 characters.");
    }
    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        problems.push("This password is too common.");
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.");
    }
    let local_part = email.split('@').next().unwrap_or_default();
    if [username, local_part]
        .iter()
        .map(|attr| attr.to_lowercase())
        .any(|attr| attr.len() >= 3 && (lowered.contains(&attr) || attr.contains(&lowered)))
    {
        problems.push("The password is too similar to the username or email.");
    }
    problems
}

/// Trimmed, non-empty text or `None`.
pub fn normalize_text(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("ada.lovelace+1").is_ok());
        assert!(validate_username("with space").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(password_problems("correct-horse-battery", "ada", "ada@example.com").is_empty());
        assert_eq!(password_problems("short", "ada", "ada@example.com").len(), 1);
        assert!(password_problems("12345678", "bob", "bob@example.com")
            .contains(&"This password is entirely numeric."));
        assert!(password_problems("password", "bob", "bob@example.com")
            .contains(&"This password is too common."));
        assert!(!password_problems("lovelace-ada-99", "lovelace", "x@example.com").is_empty());
    }

    #[test]
    fn test_field_errors_collect() {
        let mut errors = FieldErrors::new();
        errors.require("email", " ");
        errors.add("email", "second");
        errors.merge(FieldErrors::single("password", "bad"));
        assert_eq!(errors.get("email").unwrap().len(), 2);
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["email", "password"]);
        assert!(errors.clone().into_result().is_err());
        assert_eq!(errors.summary(), "email: This field is required.");

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["password"][0], "bad");
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text(Some("  hi ".into())), Some("hi".into()));
        assert_eq!(normalize_text(Some("   ".into())), None);
        assert_eq!(normalize_text(None), None);
    }
}
