//! Configuration management
//!
//! This module handles loading and parsing configuration for the quiz backend.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Environment variable holding the slow-query threshold in milliseconds
pub const SLOW_QUERY_ENV: &str = "SLOW_QUERY_MS";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Session token configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// External identity provider configuration
    #[serde(default)]
    pub identity: IdentityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (for cookie-based auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum number of pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Queries taking at least this many milliseconds are logged as slow
    #[serde(default = "default_slow_query_ms")]
    pub slow_query_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
            max_connections: default_max_connections(),
            slow_query_ms: default_slow_query_ms(),
        }
    }
}

fn default_database_url() -> String {
    "data/quiz.db".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_slow_query_ms() -> u64 {
    100
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Session token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign session tokens
    #[serde(default = "default_token_secret")]
    pub token_secret: String,
    /// Token lifetime in hours
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: default_token_secret(),
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

/// Upper bound for `auth.token_ttl_hours` (ten years)
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;

/// Development-only signing secret
pub const DEV_TOKEN_SECRET: &str = "dev-only-quiz-token-secret";

fn default_token_secret() -> String {
    DEV_TOKEN_SECRET.to_string()
}

fn default_token_ttl_hours() -> i64 {
    24
}

/// OAuth2-style identity provider the auth callback exchanges codes with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Token endpoint (authorization code -> access token)
    #[serde(default = "default_identity_token_url")]
    pub token_url: String,
    /// Userinfo endpoint (access token -> profile)
    #[serde(default = "default_identity_userinfo_url")]
    pub userinfo_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Redirect URI registered with the provider, sent back on exchange
    #[serde(default)]
    pub redirect_uri: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_identity_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            token_url: default_identity_token_url(),
            userinfo_url: default_identity_userinfo_url(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: None,
            timeout_secs: default_identity_timeout_secs(),
        }
    }
}

fn default_identity_token_url() -> String {
    "https://github.com/login/oauth/access_token".to_string()
}

fn default_identity_userinfo_url() -> String {
    "https://api.github.com/user".to_string()
}

fn default_identity_timeout_secs() -> u64 {
    10
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern `QUIZ_<SECTION>_<KEY>`,
    /// e.g. `QUIZ_SERVER_PORT` or `QUIZ_DATABASE_URL`. The slow-query
    /// threshold is read from `SLOW_QUERY_MS`.
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.token_secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.token_secret must not be empty".to_string(),
            ));
        }
        if self.auth.token_ttl_hours <= 0 {
            return Err(ConfigError::ValidationError(
                "auth.token_ttl_hours must be positive".to_string(),
            ));
        }
        if self.auth.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            return Err(ConfigError::ValidationError(format!(
                "auth.token_ttl_hours must be at most {}",
                MAX_TOKEN_TTL_HOURS
            )));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the token secret is still the built-in development value
    pub fn uses_dev_secret(&self) -> bool {
        self.auth.token_secret == DEV_TOKEN_SECRET
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // Server configuration
        if let Ok(host) = std::env::var("QUIZ_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parsed_env::<u16>("QUIZ_SERVER_PORT") {
            self.server.port = port;
        }
        if let Ok(cors_origin) = std::env::var("QUIZ_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        // Database configuration
        if let Ok(driver) = std::env::var("QUIZ_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("QUIZ_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(max) = parsed_env::<u32>("QUIZ_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = max;
        }
        if let Some(ms) = parsed_env::<u64>(SLOW_QUERY_ENV) {
            self.database.slow_query_ms = ms;
        }

        // Token configuration
        if let Ok(secret) = std::env::var("QUIZ_AUTH_TOKEN_SECRET") {
            self.auth.token_secret = secret;
        }
        if let Some(hours) = parsed_env::<i64>("QUIZ_AUTH_TOKEN_TTL_HOURS") {
            self.auth.token_ttl_hours = hours;
        }

        // Identity provider
        if let Ok(url) = std::env::var("QUIZ_IDENTITY_TOKEN_URL") {
            self.identity.token_url = url;
        }
        if let Ok(url) = std::env::var("QUIZ_IDENTITY_USERINFO_URL") {
            self.identity.userinfo_url = url;
        }
        if let Ok(id) = std::env::var("QUIZ_IDENTITY_CLIENT_ID") {
            self.identity.client_id = id;
        }
        if let Ok(secret) = std::env::var("QUIZ_IDENTITY_CLIENT_SECRET") {
            self.identity.client_secret = secret;
        }
        if let Ok(uri) = std::env::var("QUIZ_IDENTITY_REDIRECT_URI") {
            self.identity.redirect_uri = Some(uri);
        }
        if let Some(secs) = parsed_env::<u64>("QUIZ_IDENTITY_TIMEOUT_SECS") {
            self.identity.timeout_secs = secs;
        }
    }
}

/// Read and parse an environment variable, ignoring unparseable values
fn parsed_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
