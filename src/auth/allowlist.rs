//! Credential allowlist
//!
//! Accounts are configured as `username:password` and kept in their basic-auth
//! encoded form, which is what clients put in the `Authorization` header.

use base64::{engine::general_purpose::STANDARD, Engine};

/// Set of permitted credentials
///
/// An empty allowlist permits every candidate.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialAllowlist {
    entries: Vec<String>,
}

impl CredentialAllowlist {
    /// Build an allowlist from `username:password` entries
    ///
    /// # Example
    ///
    /// ```
    /// use registry_auth_relay::auth::CredentialAllowlist;
    ///
    /// let allowlist = CredentialAllowlist::from_accounts(&["user:pass".to_string()]);
    /// assert!(allowlist.is_allowed("dXNlcjpwYXNz"));
    /// assert!(!allowlist.is_allowed("b3RoZXI6cGFzcw=="));
    /// ```
    pub fn from_accounts(accounts: &[String]) -> Self {
        Self {
            entries: accounts.iter().map(|a| STANDARD.encode(a)).collect(),
        }
    }

    /// Whether no accounts are configured
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check an encoded credential against the allowlist
    pub fn is_allowed(&self, candidate: &str) -> bool {
        self.is_empty() || self.entries.iter().any(|e| e == candidate)
    }

    /// Check a username/password pair against the allowlist
    pub fn is_allowed_pair(&self, username: &str, password: &str) -> bool {
        self.is_allowed(&encode_basic(username, password))
    }
}

impl std::fmt::Debug for CredentialAllowlist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialAllowlist")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Encode a username/password pair the way a basic-auth header carries it
pub fn encode_basic(username: &str, password: &str) -> String {
    STANDARD.encode(format!("{}:{}", username, password))
}
