//! Configuration management for registry-auth-relay
//!
//! This module handles loading, parsing, and validating application configuration
//! from YAML files and environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream registry and auth service configuration
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Authentication relay configuration
    #[serde(default)]
    pub relay: RelayConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(format!("Failed to read config file: {}", e)))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(yaml);
        serde_yaml::from_str(&expanded)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse YAML: {}", e)))
    }

    /// Load configuration from environment variables
    ///
    /// Variable names follow the docker-image-proxy deployment surface
    /// (`PORT`, `UPSTREAM_REGISTRY`, `AUTH_SERVICE`, `SELF_REGISTRY`, ...).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // Server config from env
        if let Ok(host) = std::env::var("HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid port number".to_string()))?;
        }

        // Upstream config from env
        if let Ok(registry) = std::env::var("UPSTREAM_REGISTRY") {
            config.upstream.registry = registry;
        }
        if let Ok(auth_service) = std::env::var("AUTH_SERVICE") {
            config.upstream.auth_service = auth_service;
        }
        if let Ok(service) = std::env::var("UPSTREAM_SERVICE") {
            config.upstream.service = service;
        }
        if let Ok(no_auth) = std::env::var("UPSTREAM_NO_AUTH") {
            config.upstream.no_auth = no_auth == "true";
        }

        // Relay config from env
        if let Ok(self_registry) = std::env::var("SELF_REGISTRY") {
            config.relay.self_registry = self_registry;
        }
        if let Ok(self_auth_service) = std::env::var("SELF_AUTH_SERVICE") {
            config.relay.self_auth_service = self_auth_service;
        }
        if let Ok(accounts) = std::env::var("ACCOUNTS") {
            config.relay.accounts = parse_accounts(&accounts);
        }
        if let Ok(skip) = std::env::var("SKIP_AUTH_PROXY") {
            config.relay.skip_auth_proxy = skip == "true";
        }
        if let Ok(secret) = std::env::var("SERVER_SECRET") {
            config.relay.server_secret = Some(secret);
        }

        // Logging config from env
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            config.logging.format = format;
        }

        Ok(config)
    }

    /// Check values that serde cannot check on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        reqwest::Url::parse(&self.relay.self_registry).map_err(|e| {
            ConfigError::InvalidValue(format!(
                "self_registry '{}' is not a URL: {}",
                self.relay.self_registry, e
            ))
        })?;

        for (name, value) in [
            ("upstream.registry", &self.upstream.registry),
            ("upstream.auth_service", &self.upstream.auth_service),
        ] {
            reqwest::Url::parse(value).map_err(|e| {
                ConfigError::InvalidValue(format!("{} '{}' is not a URL: {}", name, value, e))
            })?;
        }

        if self.relay.self_auth_service.is_empty() {
            return Err(ConfigError::MissingRequired(
                "relay.self_auth_service".to_string(),
            ));
        }

        if let Some(account) = self.relay.accounts.iter().find(|a| !a.contains(':')) {
            return Err(ConfigError::InvalidValue(format!(
                "account '{}' must be formatted as username:password",
                account
            )));
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Upstream registry configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpstreamConfig {
    /// Upstream registry base URL
    #[serde(default = "default_upstream_registry")]
    pub registry: String,

    /// Upstream auth service base URL (token endpoint is `<auth_service>/token`)
    #[serde(default = "default_upstream_auth_service")]
    pub auth_service: String,

    /// Service name the upstream auth service issues registry tokens for
    #[serde(default = "default_upstream_service")]
    pub service: String,

    /// Upstream registry requires no authentication at all
    #[serde(default)]
    pub no_auth: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            registry: default_upstream_registry(),
            auth_service: default_upstream_auth_service(),
            service: default_upstream_service(),
            no_auth: false,
        }
    }
}

fn default_upstream_registry() -> String {
    "https://registry-1.docker.io".to_string()
}

fn default_upstream_auth_service() -> String {
    "https://auth.docker.io".to_string()
}

fn default_upstream_service() -> String {
    "registry.docker.io".to_string()
}

/// Authentication relay configuration
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct RelayConfig {
    /// Externally visible URL of this service
    #[serde(default = "default_self_registry")]
    pub self_registry: String,

    /// Service name clients present when asking this service for a token
    #[serde(default = "default_self_auth_service")]
    pub self_auth_service: String,

    /// Permitted accounts as `username:password` (empty allows everyone)
    #[serde(default)]
    pub accounts: Vec<String>,

    /// Leave upstream challenges and tokens untouched
    #[serde(default)]
    pub skip_auth_proxy: bool,

    /// HMAC secret for self-issued tokens (generated at startup when unset)
    #[serde(default)]
    pub server_secret: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            self_registry: default_self_registry(),
            self_auth_service: default_self_auth_service(),
            accounts: Vec::new(),
            skip_auth_proxy: false,
            server_secret: None,
        }
    }
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("self_registry", &self.self_registry)
            .field("self_auth_service", &self.self_auth_service)
            .field("accounts_count", &self.accounts.len())
            .field("skip_auth_proxy", &self.skip_auth_proxy)
            .field("has_server_secret", &self.server_secret.is_some())
            .finish()
    }
}

fn default_self_registry() -> String {
    "http://localhost:8080".to_string()
}

fn default_self_auth_service() -> String {
    "docker-image-proxy".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (`json` or `pretty`)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Configuration error types
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Error reading configuration file
    #[error("Failed to read configuration file: {0}")]
    FileRead(String),

    /// Error parsing configuration
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

/// Split a comma separated `ACCOUNTS` value into entries
fn parse_accounts(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Expand environment variables in a string
///
/// Supports `${VAR_NAME}` syntax
fn expand_env_vars(input: &str) -> String {
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .expect("Invalid regex pattern for environment variable expansion");

    re.replace_all(input, |caps: &regex_lite::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}
