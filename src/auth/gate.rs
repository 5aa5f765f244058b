//! Per-request authentication gate
//!
//! Decides, for each registry request, whether it may proceed and whether the
//! presented token was minted (and must therefore be verified) by this relay.

use std::sync::Arc;

use crate::error::AuthError;
use crate::models::TokenClaims;

use super::identity::ServiceIdentity;
use super::token::TokenVerifier;

/// Paths reachable without a token
pub const AUTH_EXEMPT_PATHS: &[&str] = &["/v2/", "/v2/auth", "/v2/login"];

/// Outcome of a successful gate check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Path does not require a token
    Exempt,

    /// Gate disabled by configuration
    Bypass,

    /// Token was issued upstream and is passed along unverified
    Foreign {
        /// Issuer claimed by the token
        issuer: String,
    },

    /// Self-issued token with a valid signature and window
    Verified(TokenClaims),
}

/// Authentication gate for protected registry routes
#[derive(Debug, Clone)]
pub struct AuthGate {
    identity: Arc<ServiceIdentity>,
    verifier: TokenVerifier,
    skip_auth_proxy: bool,
}

impl AuthGate {
    pub fn new(identity: Arc<ServiceIdentity>, verifier: TokenVerifier, skip_auth_proxy: bool) -> Self {
        Self {
            identity,
            verifier,
            skip_auth_proxy,
        }
    }

    /// Check a request given its path and raw `Authorization` header
    pub fn check(&self, path: &str, authorization: Option<&str>) -> Result<GateDecision, AuthError> {
        if AUTH_EXEMPT_PATHS.contains(&path) {
            return Ok(GateDecision::Exempt);
        }

        if self.skip_auth_proxy {
            return Ok(GateDecision::Bypass);
        }

        let authorization = authorization.ok_or(AuthError::MissingAuth)?;
        let token = bearer_token(authorization).ok_or(AuthError::InvalidAuthHeader)?;

        let claims = self.verifier.parse_unverified(token).map_err(|e| {
            tracing::debug!(error = %e, "Cannot decode bearer token");
            AuthError::InvalidToken
        })?;

        if !self.identity.is_self_issuer(&claims.iss) {
            return Ok(GateDecision::Foreign { issuer: claims.iss });
        }

        self.verifier.verify(token).map(GateDecision::Verified)
    }
}

/// Extract the token from a `Bearer <token>` header value
fn bearer_token(authorization: &str) -> Option<&str> {
    let (scheme, token) = authorization.split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() || token.contains(' ') {
        return None;
    }
    Some(token)
}
