//! Token issuing, password hashing and the authenticated-user extractor.

use std::time::Duration;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use circle_db::queries::users;
use circle_models::{User, UserId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Which half of a token pair a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Unique token id
    pub jti: String,
}

impl Claims {
    fn new(user: UserId, token_type: TokenType, ttl: Duration) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user.to_string(),
            token_type,
            iat: now,
            exp: now + ttl.as_secs() as i64,
            jti: Uuid::new_v4().simple().to_string(),
        }
    }

    pub fn user_id(&self) -> ApiResult<UserId> {
        self.sub
            .parse()
            .map(UserId)
            .map_err(|_| ApiError::unauthorized("Token subject is invalid"))
    }
}

/// An access/refresh token pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

/// HS256 token manager.
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtManager {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    fn encode(&self, claims: &Claims) -> ApiResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| ApiError::internal(format!("Failed to sign token: {}", e)))
    }

    pub fn access_token(&self, user: UserId) -> ApiResult<String> {
        self.encode(&Claims::new(user, TokenType::Access, self.access_ttl))
    }

    pub fn issue_pair(&self, user: UserId) -> ApiResult<TokenPair> {
        Ok(TokenPair {
            refresh: self.encode(&Claims::new(user, TokenType::Refresh, self.refresh_ttl))?,
            access: self.access_token(user)?,
        })
    }

    /// Decode a token and require the given type.
    pub fn verify(&self, token: &str, expected: TokenType) -> ApiResult<Claims> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "Token rejected");
                ApiError::unauthorized("Token is invalid or expired")
            })?
            .claims;

        if claims.token_type != expected {
            return Err(ApiError::unauthorized("Token has wrong type"));
        }
        Ok(claims)
    }
}

/// Hash a password with Argon2id and a random salt.
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored PHC hash. Malformed hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Authenticated, active user extracted from the bearer access token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> UserId {
        self.0.id
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided."))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))?;

        let claims = state.jwt.verify(token.trim(), TokenType::Access)?;
        let user_id = claims.user_id()?;

        let user = state
            .db
            .with_conn(|conn| users::get_user(conn, user_id))?
            .filter(|user| user.is_active)
            .ok_or_else(|| ApiError::unauthorized("User not found or inactive"))?;

        Ok(AuthUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new("test-secret", Duration::from_secs(300), Duration::from_secs(3600))
    }

    #[test]
    fn test_pair_roundtrip_and_type_check() {
        let jwt = manager();
        let pair = jwt.issue_pair(UserId(7)).unwrap();

        let access = jwt.verify(&pair.access, TokenType::Access).unwrap();
        assert_eq!(access.user_id().unwrap(), UserId(7));
        let refresh = jwt.verify(&pair.refresh, TokenType::Refresh).unwrap();
        assert_ne!(access.jti, refresh.jti);

        assert!(matches!(
            jwt.verify(&pair.refresh, TokenType::Access),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_and_foreign_tokens_rejected() {
        let jwt = manager();
        let mut claims = Claims::new(UserId(1), TokenType::Access, Duration::from_secs(60));
        claims.exp = Utc::now().timestamp() - 10;
        let expired = jwt.encode(&claims).unwrap();
        assert!(jwt.verify(&expired, TokenType::Access).is_err());

        let other = JwtManager::new("other-secret", Duration::from_secs(60), Duration::from_secs(60));
        let foreign = other.access_token(UserId(1)).unwrap();
        assert!(jwt.verify(&foreign, TokenType::Access).is_err());
        assert!(jwt.verify("not-a-token", TokenType::Access).is_err());
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }
}
