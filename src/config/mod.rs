use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration problems found at startup. Never produced per request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    #[error("invalid configuration for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub max_request_size_bytes: usize,
    pub request_timeout_secs: u64,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub connect_timeout_secs: u64,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub bcrypt_cost: u32,
    pub allow_registration: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub dir: String,
    pub max_file_bytes: usize,
    pub max_files: usize,
    pub public_base_url: Option<String>,
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl UploadConfig {
    /// Multipart framing allowance per file part.
    const PART_OVERHEAD_BYTES: usize = 64 * 1024;

    /// Largest request body an upload route accepts: every file at its limit plus framing.
    pub fn body_limit(&self) -> usize {
        self.max_files
            .saturating_mul(self.max_file_bytes.saturating_add(Self::PART_OVERHEAD_BYTES))
            .saturating_add(Self::PART_OVERHEAD_BYTES)
    }
}

impl AppConfig {
    /// Load from the process environment and validate required keys.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(&lookup);

        config.validate()?;
        Ok(config)
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        // Server overrides
        if let Some(v) = non_empty("FOLIO_API_PORT").or_else(|| non_empty("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Some(v) = non_empty("API_MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }
        if let Some(v) = non_empty("API_REQUEST_TIMEOUT_SECS") {
            self.server.request_timeout_secs = v.parse().unwrap_or(self.server.request_timeout_secs);
        }
        if let Some(v) = non_empty("SECURITY_CORS_ORIGINS") {
            self.server.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Database overrides
        if let Some(v) = non_empty("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = non_empty("DATABASE_CONNECT_TIMEOUT_SECS") {
            self.database.connect_timeout_secs = v.parse().unwrap_or(self.database.connect_timeout_secs);
        }
        if let Some(v) = non_empty("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }

        // Security overrides
        if let Some(v) = non_empty("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Some(v) = non_empty("SECURITY_BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }
        if let Some(v) = non_empty("SECURITY_ALLOW_REGISTRATION") {
            self.security.allow_registration = v.parse().unwrap_or(self.security.allow_registration);
        }

        // Upload overrides
        if let Some(v) = non_empty("UPLOAD_DIR") {
            self.uploads.dir = v;
        }
        if let Some(v) = non_empty("UPLOAD_MAX_FILE_BYTES") {
            self.uploads.max_file_bytes = v.parse().unwrap_or(self.uploads.max_file_bytes);
        }
        if let Some(v) = non_empty("UPLOAD_MAX_FILES") {
            self.uploads.max_files = v.parse().unwrap_or(self.uploads.max_files);
        }
        if let Some(v) = non_empty("UPLOAD_PUBLIC_BASE_URL") {
            self.uploads.public_base_url = Some(v.trim_end_matches('/').to_string());
        }

        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.is_empty() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        let url = url::Url::parse(&self.database.url).map_err(|e| ConfigError::Invalid {
            key: "DATABASE_URL",
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "postgres" | "postgresql" | "memory") {
            return Err(ConfigError::Invalid {
                key: "DATABASE_URL",
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "SECURITY_BCRYPT_COST",
                reason: format!("{} is outside 4..=31", self.security.bcrypt_cost),
            });
        }
        if self.uploads.max_files == 0 {
            return Err(ConfigError::Invalid {
                key: "UPLOAD_MAX_FILES",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 5001,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
                request_timeout_secs: 30,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ],
            },
            database: DatabaseConfig {
                url: String::new(),
                connect_timeout_secs: 10,
                max_connections: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                bcrypt_cost: 10,
                allow_registration: true,
            },
            uploads: UploadConfig {
                dir: "uploads".to_string(),
                max_file_bytes: 5 * 1024 * 1024, // 5MB
                max_files: 10,
                public_base_url: None,
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.server.cors_origins = vec!["https://staging.example.com".to_string()];
        config.security.bcrypt_cost = 12;
        config
    }

    fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.server.cors_origins = vec!["https://app.example.com".to_string()];
        config.database.connect_timeout_secs = 5;
        config.security.bcrypt_cost = 12;
        config.security.allow_registration = false;
        config
    }
}
