//! Upstream registry access
//!
//! This module contains the forwarder used to reach the upstream registry and
//! its token service, plus registry API path classification.

pub mod http;
pub mod path;
pub mod traits;

pub use self::http::{into_response, HttpForwarder};
pub use path::{parse_registry_path, RegistryPath, RegistryRequestType};
pub use traits::{RegistryForwarder, UpstreamResponse};

#[cfg(test)]
pub use traits::MockRegistryForwarder;
