use std::env;
use thiserror::Error;

/// Eight days, matching the session length the front end expects.
const DEFAULT_TOKEN_EXPIRE_MINUTES: i64 = 60 * 24 * 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_address: String,
    pub port: u16,
    pub access_token_expire_minutes: i64,
    pub first_superuser: Option<FirstSuperuser>,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FirstSuperuser {
    pub email: String,
    pub password: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|e| ConfigError::Invalid("PORT", e.to_string()))?,
            Err(_) => 8080,
        };

        let access_token_expire_minutes = match env::var("ACCESS_TOKEN_EXPIRE_MINUTES") {
            Ok(raw) => raw
                .parse::<i64>()
                .map_err(|e| ConfigError::Invalid("ACCESS_TOKEN_EXPIRE_MINUTES", e.to_string()))?,
            Err(_) => DEFAULT_TOKEN_EXPIRE_MINUTES,
        };

        // Both halves must be present for the bootstrap account to be created
        let first_superuser = match (env::var("FIRST_SUPERUSER"), env::var("FIRST_SUPERUSER_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.is_empty() => Some(FirstSuperuser { email, password }),
            _ => None,
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_default();

        Ok(Self {
            database_url,
            jwt_secret,
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port,
            access_token_expire_minutes,
            first_superuser,
            cors_origins,
        })
    }

    /// Settings for tests and tools that never touch the environment.
    pub fn for_secret(jwt_secret: &str) -> Self {
        Self {
            database_url: String::new(),
            jwt_secret: jwt_secret.to_string(),
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            access_token_expire_minutes: DEFAULT_TOKEN_EXPIRE_MINUTES,
            first_superuser: None,
            cors_origins: Vec::new(),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}
