//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

use circle_media::MediaConfig;

use crate::error::{ApiError, ApiResult};

/// Signing secret used outside production when `JWT_SECRET` is unset.
const DEVELOPMENT_JWT_SECRET: &str = "circle-development-secret-change-me";

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second
    pub rate_limit_rps: u32,
    /// Rate limit burst
    pub rate_limit_burst: u32,
    /// Request timeout
    pub request_timeout: Duration,
    /// Max request body size (uploads included)
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// SQLite database file, or `:memory:`
    pub database_path: PathBuf,
    /// Where uploads live and the URL they are served under
    pub media: MediaConfig,
    /// HS256 signing secret
    pub jwt_secret: Option<String>,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            rate_limit_burst: 20,
            request_timeout: Duration::from_secs(30),
            max_body_size: 25 * 1024 * 1024, // 25MB
            environment: "development".to_string(),
            database_path: PathBuf::from("circle.db"),
            media: MediaConfig::default(),
            jwt_secret: None,
            access_token_ttl: Duration::from_secs(5 * 60),
            refresh_token_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

/// Whether an `ENVIRONMENT` value names production, in any case.
pub fn is_production_environment(environment: &str) -> bool {
    environment.trim().eq_ignore_ascii_case("production")
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT").unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: env_parse("RATE_LIMIT_RPS").unwrap_or(defaults.rate_limit_rps),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST").unwrap_or(defaults.rate_limit_burst),
            request_timeout: env_parse("REQUEST_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_body_size: env_parse("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            database_path: std::env::var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            media: MediaConfig::from_env(),
            jwt_secret: std::env::var("JWT_SECRET").ok().filter(|s| !s.trim().is_empty()),
            access_token_ttl: env_parse("ACCESS_TOKEN_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.access_token_ttl),
            refresh_token_ttl: env_parse("REFRESH_TOKEN_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.refresh_token_ttl),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        is_production_environment(&self.environment)
    }

    /// The token signing secret. Production refuses to start without one.
    pub fn signing_secret(&self) -> ApiResult<&str> {
        match self.jwt_secret.as_deref() {
            Some(secret) => Ok(secret),
            None if self.is_production() => {
                Err(ApiError::internal("JWT_SECRET must be set in production"))
            }
            None => Ok(DEVELOPMENT_JWT_SECRET),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_secret_required_in_production() {
        let mut config = ApiConfig::default();
        assert_eq!(config.signing_secret().unwrap(), DEVELOPMENT_JWT_SECRET);

        config.environment = "Production".to_string();
        assert!(config.signing_secret().is_err());

        config.jwt_secret = Some("s3cret".to_string());
        assert_eq!(config.signing_secret().unwrap(), "s3cret");
    }

    #[test]
    fn test_production_environment_is_case_insensitive() {
        assert!(is_production_environment("production"));
        assert!(is_production_environment("Production"));
        assert!(is_production_environment(" PRODUCTION "));
        assert!(!is_production_environment("staging"));
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.max_body_size, 25 * 1024 * 1024);
        assert_eq!(config.access_token_ttl, Duration::from_secs(300));
        assert!(!config.is_production());
    }
}
