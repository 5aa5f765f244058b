//! Registry forwarder trait definition
//!
//! This module defines the `RegistryForwarder` trait, the relay's only way of
//! talking to the upstream registry and its auth service.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Response};

use crate::error::UpstreamError;

/// Upstream response with a streaming body
pub type UpstreamResponse = Response<Body>;

/// Trait for upstream registry access
///
/// Implementations must not cache or transform content; responses are handed
/// back with the upstream status, headers and body.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistryForwarder: Send + Sync {
    /// Fetch the upstream challenge (`GET /v2/` without credentials)
    async fn fetch_challenge(&self) -> Result<UpstreamResponse, UpstreamError>;

    /// Exchange a basic-auth `authorization` header for an upstream token
    ///
    /// An empty `scope` is not sent.
    async fn authenticate(
        &self,
        authorization: &str,
        service: &str,
        scope: &str,
    ) -> Result<String, UpstreamError>;

    /// Forward a request for `path_and_query` with the client's method and headers
    ///
    /// `strip_authorization` drops the client's `Authorization` header, used
    /// when it carried a token the upstream cannot understand.
    async fn forward(
        &self,
        method: &Method,
        path_and_query: &str,
        headers: &HeaderMap,
        strip_authorization: bool,
    ) -> Result<UpstreamResponse, UpstreamError>;

    /// Base URL of the upstream registry
    fn upstream_url(&self) -> &str;
}
