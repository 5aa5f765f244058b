//! Domain models for registry-auth-relay
//!
//! This module contains the core domain models used throughout the application.

pub mod challenge;
pub mod token;

// Re-export commonly used types
pub use challenge::Challenge;
pub use token::{AccessClaim, LoginForm, TokenClaims, TokenQuery, TokenResponse, TOKEN_LIFETIME_SECS};
