//! HTTP router for registry-auth-relay
//!
//! This module defines the axum router that handles all HTTP requests.
//! It provides routes for:
//! - Health checks
//! - The registry challenge, token and login endpoints
//! - Gated passthrough of registry content to the upstream

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Form, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{
    encode_basic, AuthGate, ChallengeRewriter, CredentialAllowlist, ServiceIdentity, TokenIssuer,
    TokenVerifier,
};
use crate::config::Config;
use crate::error::AuthError;
use crate::models::{LoginForm, TokenQuery, TokenResponse};
use crate::upstream::{parse_registry_path, RegistryForwarder};

use super::middleware::{auth_middleware, logging_middleware, AuthResponse, VerifiedToken};

/// Scope granted by the login flow when the upstream needs no credentials
const LOGIN_SCOPE: &str = "registry:catalog:*";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Own identity and signing secret
    pub identity: Arc<ServiceIdentity>,

    /// Permitted accounts
    pub allowlist: Arc<CredentialAllowlist>,

    /// Self-issued token minting
    pub issuer: Arc<TokenIssuer>,

    /// Per-request authentication gate
    pub gate: Arc<AuthGate>,

    /// Challenge rewriter (None leaves upstream challenges untouched)
    pub rewriter: Option<Arc<ChallengeRewriter>>,

    /// Upstream registry access
    pub forwarder: Arc<dyn RegistryForwarder>,

    /// Upstream service name used by the login flow
    pub upstream_service: String,

    /// Upstream registry needs no credentials
    pub upstream_no_auth: bool,
}

impl AppState {
    /// Wire the relay components from configuration
    pub fn new(config: &Config, forwarder: Arc<dyn RegistryForwarder>) -> Self {
        let identity = Arc::new(ServiceIdentity::from_config(&config.relay));
        Self::with_identity(config, identity, forwarder)
    }

    /// Wire the relay components around an existing identity
    pub fn with_identity(
        config: &Config,
        identity: Arc<ServiceIdentity>,
        forwarder: Arc<dyn RegistryForwarder>,
    ) -> Self {
        let verifier = TokenVerifier::new(Arc::clone(&identity));
        let gate = AuthGate::new(
            Arc::clone(&identity),
            verifier,
            config.relay.skip_auth_proxy,
        );

        let rewriter = if config.relay.skip_auth_proxy {
            None
        } else {
            match identity.token_realm() {
                Ok(realm) => Some(Arc::new(ChallengeRewriter::new(
                    realm,
                    &identity.self_auth_service,
                ))),
                Err(e) => {
                    tracing::warn!(error = %e, "Cannot derive own token realm, challenges will pass through unmodified");
                    None
                }
            }
        };

        Self {
            allowlist: Arc::new(CredentialAllowlist::from_accounts(&config.relay.accounts)),
            issuer: Arc::new(TokenIssuer::new(Arc::clone(&identity))),
            gate: Arc::new(gate),
            rewriter,
            forwarder,
            upstream_service: config.upstream.service.clone(),
            upstream_no_auth: config.upstream.no_auth,
            identity,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("identity", &self.identity)
            .field("allowlist", &self.allowlist)
            .field("rewrites_challenges", &self.rewriter.is_some())
            .field("upstream", &self.forwarder.upstream_url())
            .field("upstream_service", &self.upstream_service)
            .field("upstream_no_auth", &self.upstream_no_auth)
            .finish()
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Build the main application router
///
/// # Arguments
///
/// * `state` - Application state containing the relay components
///
/// # Returns
///
/// An axum Router configured with all endpoints
pub fn build_router(state: AppState) -> Router {
    // `/v2/*path` does not match the bare `/v2/`, hence both routes
    let registry = Router::new()
        .route("/v2/", get(challenge_handler))
        .route("/v2/auth", get(token_handler))
        .route("/v2/login", post(login_handler))
        .route("/v2/*path", get(registry_proxy_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .merge(registry)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

// =============================================================================
// Health Handler
// =============================================================================

/// Health check endpoint handler
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Authentication Handlers
// =============================================================================

/// Challenge endpoint handler (`GET /v2/`)
///
/// Relays the upstream version-check response with its challenge pointed at
/// this relay's token endpoint.
async fn challenge_handler(State(state): State<AppState>) -> Response {
    match state.forwarder.fetch_challenge().await {
        Ok(upstream) => match &state.rewriter {
            Some(rewriter) => rewriter.rewrite(upstream).into_response(),
            None => upstream.into_response(),
        },
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch upstream challenge");
            AuthResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to get auth challenge",
            )
            .into_response()
        }
    }
}

/// Token endpoint handler (`GET /v2/auth?service=..&scope=..`)
///
/// Issues a token locally when the request targets this relay's own service
/// name, otherwise delegates to the upstream token service.
async fn token_handler(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AuthResponse> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingAuth)
        .map_err(reject_token_request)?;

    let credential = authorization
        .split_once(' ')
        .map(|(_, credential)| credential)
        .filter(|credential| !credential.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
        .map_err(reject_token_request)?;

    if !state.allowlist.is_allowed(credential) {
        return Err(reject_token_request(AuthError::UnauthorizedAccount));
    }

    let token = if query.service == state.identity.self_auth_service {
        state.issuer.issue(&query.scope).map_err(|e| {
            tracing::warn!(error = %e, scope = %query.scope, "Local token issuance failed");
            AuthResponse::authentication_failed()
        })?
    } else {
        state
            .forwarder
            .authenticate(authorization, &query.service, &query.scope)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, service = %query.service, "Upstream token exchange failed");
                AuthResponse::authentication_failed()
            })?
    };

    Ok(Json(TokenResponse::new(token)))
}

fn reject_token_request(reason: AuthError) -> AuthResponse {
    tracing::debug!(reason = %reason, "Token request rejected");
    AuthResponse::authentication_failed()
}

/// Login handler (`POST /v2/login`)
async fn login_handler(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AuthResponse> {
    if !state.allowlist.is_allowed_pair(&form.username, &form.password) {
        tracing::debug!(username = %form.username, "Login rejected by allowlist");
        return Err(AuthResponse::from_error(AuthError::UnauthorizedAccount));
    }

    let token = if state.upstream_no_auth {
        state.issuer.issue(LOGIN_SCOPE).map_err(|e| {
            tracing::error!(error = %e, "Failed to issue login token");
            login_failed()
        })?
    } else {
        let authorization = format!("Basic {}", encode_basic(&form.username, &form.password));
        state
            .forwarder
            .authenticate(&authorization, &state.upstream_service, "")
            .await
            .map_err(|e| {
                tracing::error!(error = %e, username = %form.username, "Upstream login failed");
                login_failed()
            })?
    };

    Ok(Json(TokenResponse::new(token)))
}

fn login_failed() -> AuthResponse {
    AuthResponse::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to get docker registry token",
    )
}

// =============================================================================
// Registry Proxy Handler
// =============================================================================

/// Registry content handler (`GET`/`HEAD /v2/...`)
///
/// Streams the upstream response back unchanged. The client's token is only
/// withheld from the upstream when it was issued by this relay.
async fn registry_proxy_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    verified: Option<Extension<VerifiedToken>>,
    headers: HeaderMap,
) -> Response {
    let path = uri.path();

    let parsed = match parse_registry_path(path) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!(error = %e, "Unknown registry path");
            return AuthResponse::new(StatusCode::NOT_FOUND, "Not found").into_response();
        }
    };

    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or(path);
    let strip_authorization = verified.is_some();

    tracing::debug!(
        request_type = parsed.request_type.as_str(),
        name = %parsed.name,
        reference = ?parsed.reference,
        "Forwarding registry request"
    );

    match state
        .forwarder
        .forward(&method, path_and_query, &headers, strip_authorization)
        .await
    {
        Ok(upstream) => upstream.into_response(),
        Err(e) => {
            tracing::error!(error = %e, path = %path, "Upstream request failed");
            AuthResponse::new(StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
