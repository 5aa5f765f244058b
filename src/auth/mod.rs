//! Authentication relay for registry-auth-relay
//!
//! This module provides the protocol and security logic of the relay:
//! - Credential allowlist checks
//! - Self-issued token minting and verification
//! - `WWW-Authenticate` challenge rewriting
//! - The per-request gate deciding which tokens to verify

pub mod allowlist;
pub mod challenge;
pub mod gate;
pub mod identity;
pub mod token;

pub use allowlist::{encode_basic, CredentialAllowlist};
pub use challenge::ChallengeRewriter;
pub use gate::{AuthGate, GateDecision, AUTH_EXEMPT_PATHS};
pub use identity::{ServerSecret, ServiceIdentity};
pub use token::{TokenIssuer, TokenVerifier};
