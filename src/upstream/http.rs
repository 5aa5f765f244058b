//! HTTP registry forwarder
//!
//! `RegistryForwarder` implementation over `reqwest`. Bodies are streamed back
//! to the client as they arrive; nothing is buffered or decompressed.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, Method, Response};
use reqwest::Client;
use tracing::debug;

use crate::config::UpstreamConfig;
use crate::error::UpstreamError;

use super::traits::{RegistryForwarder, UpstreamResponse};

/// Headers that describe a single connection and are never forwarded
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Forwarder talking to a real upstream registry over HTTP
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: Client,
    registry: String,
    auth_service: String,
}

impl HttpForwarder {
    /// Create a forwarder for the configured upstream
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent(concat!("registry-auth-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, &config.registry, &config.auth_service))
    }

    /// Create a forwarder with a custom reqwest Client
    pub fn with_client(client: Client, registry: &str, auth_service: &str) -> Self {
        Self {
            client,
            registry: registry.trim_end_matches('/').to_string(),
            auth_service: auth_service.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RegistryForwarder for HttpForwarder {
    async fn fetch_challenge(&self) -> Result<UpstreamResponse, UpstreamError> {
        let url = format!("{}/v2/", self.registry);
        debug!(url = %url, "Fetching upstream challenge");

        let response = self.client.get(&url).send().await?;
        Ok(into_response(response))
    }

    async fn authenticate(
        &self,
        authorization: &str,
        service: &str,
        scope: &str,
    ) -> Result<String, UpstreamError> {
        let scheme = authorization.split(' ').next().unwrap_or_default();
        if !scheme.eq_ignore_ascii_case("basic") {
            return Err(UpstreamError::UnsupportedScheme(scheme.to_string()));
        }

        let url = format!("{}/token", self.auth_service);
        let mut query = vec![("service", service)];
        if !scope.is_empty() {
            query.push(("scope", scope));
        }

        debug!(url = %url, service = %service, scope = %scope, "Requesting upstream token");

        let response = self
            .client
            .get(&url)
            .query(&query)
            .header(header::AUTHORIZATION, authorization)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body: serde_json::Value = response.json().await?;
        ["token", "access_token"]
            .iter()
            .find_map(|key| body.get(*key).and_then(|v| v.as_str()))
            .filter(|token| !token.is_empty())
            .map(|token| token.to_string())
            .ok_or_else(|| UpstreamError::InvalidResponse("no token in response".to_string()))
    }

    async fn forward(
        &self,
        method: &Method,
        path_and_query: &str,
        headers: &HeaderMap,
        strip_authorization: bool,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let url = format!("{}{}", self.registry, path_and_query);

        let mut outbound = filter_hop_by_hop(headers);
        outbound.remove(header::HOST);
        if strip_authorization {
            outbound.remove(header::AUTHORIZATION);
        }

        debug!(method = %method, url = %url, strip_authorization, "Forwarding request upstream");

        let response = self
            .client
            .request(method.clone(), &url)
            .headers(outbound)
            .send()
            .await?;
        Ok(into_response(response))
    }

    fn upstream_url(&self) -> &str {
        &self.registry
    }
}

/// Convert an upstream response into a streaming axum response
pub fn into_response(upstream: reqwest::Response) -> UpstreamResponse {
    let status = upstream.status();
    let headers = filter_hop_by_hop(upstream.headers());

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Copy a header map without connection-level headers
fn filter_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !is_hop_by_hop(name) {
            filtered.append(name.clone(), value.clone());
        }
    }
    filtered
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name.as_str())
}
