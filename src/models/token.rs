//! Token-related domain models
//!
//! This module defines the claim set carried by registry access tokens and the
//! JSON bodies exchanged at the token endpoint.

use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// Lifetime of a self-issued token in seconds
pub const TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;

/// One resource/action grant inside a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaim {
    /// Resource type (e.g. `repository`, `registry`)
    #[serde(rename = "type", default)]
    pub resource_type: String,

    /// Resource name (e.g. `library/ubuntu`)
    #[serde(default)]
    pub name: String,

    /// Granted actions (e.g. `pull`)
    #[serde(default)]
    pub actions: Vec<String>,
}

impl AccessClaim {
    /// Create a new access claim
    pub fn new(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        actions: Vec<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            actions,
        }
    }

    /// Parse a `type:name:action` scope string
    ///
    /// The type is the text before the first `:` and the action the text after
    /// the last `:`, so names carrying a registry port survive intact.
    ///
    /// # Example
    ///
    /// ```
    /// use registry_auth_relay::models::AccessClaim;
    ///
    /// let claim = AccessClaim::from_scope("repository:localhost:5000/app:pull").unwrap();
    /// assert_eq!(claim.resource_type, "repository");
    /// assert_eq!(claim.name, "localhost:5000/app");
    /// assert_eq!(claim.actions, vec!["pull".to_string()]);
    /// ```
    pub fn from_scope(scope: &str) -> Result<Self, TokenError> {
        let (resource_type, rest) = scope
            .split_once(':')
            .ok_or_else(|| TokenError::InvalidScope(scope.to_string()))?;
        let (name, action) = rest
            .rsplit_once(':')
            .ok_or_else(|| TokenError::InvalidScope(scope.to_string()))?;

        if resource_type.is_empty() || name.is_empty() || action.is_empty() {
            return Err(TokenError::InvalidScope(scope.to_string()));
        }

        Ok(Self::new(resource_type, name, vec![action.to_string()]))
    }
}

/// Claim set of a registry access token
///
/// Every field defaults when absent so that tokens minted by other issuers can
/// still be inspected for their issuer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer
    #[serde(default)]
    pub iss: String,

    /// Audience (a single-element array from other issuers is accepted)
    #[serde(default, deserialize_with = "audience")]
    pub aud: String,

    /// Subject
    #[serde(default)]
    pub sub: String,

    /// Unique token ID
    #[serde(default)]
    pub jti: String,

    /// Expiration time (unix seconds)
    #[serde(default)]
    pub exp: i64,

    /// Issued-at time (unix seconds)
    #[serde(default)]
    pub iat: i64,

    /// Not-before time (unix seconds)
    #[serde(default)]
    pub nbf: i64,

    /// Granted access
    #[serde(default)]
    pub access: Vec<AccessClaim>,
}

impl TokenClaims {
    /// Build the claims for a token issued by `identity` at `now`
    pub fn self_issued(identity: &str, access: AccessClaim, now: i64) -> Self {
        Self {
            iss: identity.to_string(),
            aud: identity.to_string(),
            sub: identity.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            exp: now + TOKEN_LIFETIME_SECS,
            iat: now,
            nbf: now,
            access: vec![access],
        }
    }
}

fn audience<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Audience {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Audience::deserialize(deserializer)? {
        Audience::One(aud) => aud,
        Audience::Many(auds) => auds.into_iter().next().unwrap_or_default(),
    })
}

/// Query parameters of the token endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenQuery {
    /// Service the token is requested for
    #[serde(default)]
    pub service: String,

    /// Requested scope
    #[serde(default)]
    pub scope: String,
}

/// Form body of the login endpoint
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Body returned by the token and login endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed bearer token
    pub token: String,
}

impl TokenResponse {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}
