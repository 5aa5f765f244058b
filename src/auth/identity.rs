//! Service identity
//!
//! The relay's own name, URL and signing secret. Built once at startup and
//! shared by the issuer, verifier and gate.

use crate::config::{ConfigError, RelayConfig};

/// HMAC secret used to sign self-issued tokens
#[derive(Clone, PartialEq, Eq)]
pub struct ServerSecret(String);

impl ServerSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Generate a random secret for the lifetime of the process
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for ServerSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ServerSecret([REDACTED])")
    }
}

/// Who this relay is
#[derive(Debug, Clone)]
pub struct ServiceIdentity {
    /// Externally visible URL of this service
    pub self_registry: String,

    /// Service name clients request tokens for
    pub self_auth_service: String,

    /// Signing secret
    pub secret: ServerSecret,
}

impl ServiceIdentity {
    pub fn new(
        self_registry: impl Into<String>,
        self_auth_service: impl Into<String>,
        secret: ServerSecret,
    ) -> Self {
        Self {
            self_registry: self_registry.into(),
            self_auth_service: self_auth_service.into(),
            secret,
        }
    }

    /// Build the identity from configuration
    ///
    /// A missing secret is replaced by a random one; tokens signed with it do
    /// not survive a restart.
    pub fn from_config(config: &RelayConfig) -> Self {
        let secret = match config.server_secret.as_deref() {
            Some(secret) if !secret.is_empty() => ServerSecret::new(secret),
            _ => {
                tracing::warn!(
                    "No server secret configured, generated a random one; \
                     issued tokens will not survive a restart"
                );
                ServerSecret::generate()
            }
        };

        Self::new(&config.self_registry, &config.self_auth_service, secret)
    }

    /// Whether `issuer` names this relay
    pub fn is_self_issuer(&self, issuer: &str) -> bool {
        issuer == self.self_auth_service || issuer == self.self_registry
    }

    /// URL of this relay's token endpoint, advertised as challenge realm
    pub fn token_realm(&self) -> Result<String, ConfigError> {
        let mut url = reqwest::Url::parse(&self.self_registry).map_err(|e| {
            ConfigError::InvalidValue(format!("self_registry '{}': {}", self.self_registry, e))
        })?;
        url.set_path("/v2/auth");
        Ok(url.to_string())
    }
}
