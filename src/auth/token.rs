//! Token issuance and verification
//!
//! Self-issued tokens are compact JWS strings signed with HS256 over the
//! process secret. Reading a token's claims and trusting them are two separate
//! operations: [`TokenVerifier::parse_unverified`] only decodes, while
//! [`TokenVerifier::verify`] checks signature and validity window.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::error::{AuthError, TokenError};
use crate::models::{AccessClaim, TokenClaims};

use super::identity::ServiceIdentity;

/// Mints self-issued access tokens
#[derive(Clone)]
pub struct TokenIssuer {
    identity: Arc<ServiceIdentity>,
    key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(identity: Arc<ServiceIdentity>) -> Self {
        let key = EncodingKey::from_secret(identity.secret.as_bytes());
        Self { identity, key }
    }

    /// Issue a token granting `scope` (`type:name:action`) for 24 hours
    ///
    /// The scope is validated before anything is signed.
    pub fn issue(&self, scope: &str) -> Result<String, TokenError> {
        let access = AccessClaim::from_scope(scope)?;
        let claims =
            TokenClaims::self_issued(&self.identity.self_registry, access, Utc::now().timestamp());

        tracing::debug!(jti = %claims.jti, scope = %scope, "Issuing token");

        self.sign(&claims)
    }

    /// Sign an arbitrary claim set with the process secret
    pub(crate) fn sign(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("identity", &self.identity)
            .finish()
    }
}

/// Reads and verifies access tokens
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
    unverified: Validation,
}

impl TokenVerifier {
    pub fn new(identity: Arc<ServiceIdentity>) -> Self {
        let key = DecodingKey::from_secret(identity.secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf", "iss"]);
        validation.set_audience(&[&identity.self_registry, &identity.self_auth_service]);
        validation.set_issuer(&[&identity.self_registry, &identity.self_auth_service]);

        // Structure only: header and claims must decode, nothing is checked
        let mut unverified = Validation::new(Algorithm::HS256);
        unverified.insecure_disable_signature_validation();
        unverified.validate_exp = false;
        unverified.validate_nbf = false;
        unverified.validate_aud = false;
        unverified.set_required_spec_claims::<&str>(&[]);

        Self {
            key,
            validation,
            unverified,
        }
    }

    /// Decode the claims without checking signature or validity window
    ///
    /// Only suitable for routing decisions such as reading the issuer.
    pub fn parse_unverified(&self, token: &str) -> Result<TokenClaims, TokenError> {
        decode::<TokenClaims>(token, &self.key, &self.unverified)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Malformed(e.to_string()))
    }

    /// Verify signature and validity window, returning the trusted claims
    ///
    /// Every failure is reported as [`AuthError::InvalidToken`]; the cause is
    /// logged at debug level only.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let claims = decode::<TokenClaims>(token, &self.key, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token verification failed");
                AuthError::InvalidToken
            })?
            .claims;

        if claims.exp <= Utc::now().timestamp() {
            tracing::debug!(exp = claims.exp, "Token expired");
            return Err(AuthError::InvalidToken);
        }

        Ok(claims)
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}
