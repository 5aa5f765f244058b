//! Application error types for registry-auth-relay
//!
//! This module defines common error types used throughout the application.
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

use crate::config::ConfigError;

/// Authentication-related errors
///
/// Every variant surfaces to clients as a 401 with a generic message.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    /// Missing authorization header
    #[error("Missing authorization header")]
    MissingAuth,

    /// Authorization header is not `<scheme> <credential>`
    #[error("Invalid authorization header format")]
    InvalidAuthHeader,

    /// Token could not be decoded, has a bad signature, or is outside its validity window
    #[error("Invalid token")]
    InvalidToken,

    /// Credential is not in the configured allowlist
    #[error("Unauthorized account")]
    UnauthorizedAccount,

    /// Token exchange failed (local issuance or upstream delegation)
    #[error("Authentication failed")]
    AuthenticationFailed,
}

/// Token issuance and decoding errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TokenError {
    /// Scope is not `type:name:action`
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// Token is not a decodable three-part JWS
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// Signing the token failed
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// Errors talking to the upstream registry or auth service
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Transport-level failure
    #[error("Upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Upstream answered with an unexpected status
    #[error("Unexpected upstream status: HTTP {0}")]
    Status(u16),

    /// Upstream body could not be interpreted
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    /// Credential scheme cannot be delegated upstream
    #[error("Unsupported authorization scheme: {0}")]
    UnsupportedScheme(String),
}

/// Request parsing errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Startup error
///
/// Wiring the relay can only fail on configuration or while building the
/// upstream client.
#[derive(Debug, Error)]
pub enum AppError {
    /// Upstream error
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
