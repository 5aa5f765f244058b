//! registry-auth-relay - Authentication relay for a container image registry proxy
//!
//! This crate sits in front of an upstream container registry. It issues its own
//! short-lived bearer tokens, verifies them on the way back in, passes upstream
//! tokens through untouched, and rewrites upstream `WWW-Authenticate` challenges
//! so registry clients ask this service for tokens.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod telemetry;
pub mod upstream;
