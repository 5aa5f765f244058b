//! HTTP middleware for registry-auth-relay
//!
//! This module provides middleware layers for:
//! - The per-request authentication gate
//! - Request/response logging

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;

use crate::auth::GateDecision;
use crate::error::AuthError;
use crate::models::TokenClaims;

use super::router::AppState;

/// Claims of a verified self-issued token, attached to the request
#[derive(Clone, Debug)]
pub struct VerifiedToken(pub TokenClaims);

/// Authentication middleware function
///
/// Runs the gate and, for verified self-issued tokens, attaches the claims
/// to the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthResponse> {
    let path = request.uri().path().to_owned();
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let decision = state.gate.check(&path, authorization).map_err(|e| {
        tracing::debug!(path = %path, error = %e, "Request rejected by auth gate");
        AuthResponse::from_error(e)
    })?;

    match decision {
        GateDecision::Verified(claims) => {
            tracing::debug!(path = %path, jti = %claims.jti, "Self-issued token verified");
            request.extensions_mut().insert(VerifiedToken(claims));
        }
        GateDecision::Foreign { issuer } => {
            tracing::debug!(path = %path, issuer = %issuer, "Passing foreign token through");
        }
        GateDecision::Exempt | GateDecision::Bypass => {}
    }

    Ok(next.run(request).await)
}

/// JSON error response
pub struct AuthResponse {
    status: StatusCode,
    message: String,
}

impl AuthResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Every gate failure is a 401 carrying the error's generic message
    pub fn from_error(error: AuthError) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, error.to_string())
    }

    pub fn authentication_failed() -> Self {
        Self::from_error(AuthError::AuthenticationFailed)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AuthResponse {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message
        });
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

/// Logging middleware function
///
/// Logs request and response details including:
/// - Method and path
/// - Status code
/// - Response time
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        path = %uri.path(),
        status = %status.as_u16(),
        duration_ms = %elapsed.as_millis(),
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::AccessClaim;
    use crate::upstream::MockRegistryForwarder;
    use axum::http::HeaderValue;
    use axum::{middleware, routing::get, Extension, Router};
    use axum_test::TestServer;
    use std::sync::Arc;

    fn create_test_state() -> AppState {
        let mut config = Config::default();
        config.relay.self_registry = "https://proxy.example.com".to_string();
        config.relay.server_secret = Some("middleware-secret".to_string());
        AppState::new(&config, Arc::new(MockRegistryForwarder::new()))
    }

    async fn claims_handler(verified: Option<Extension<VerifiedToken>>) -> String {
        match verified {
            Some(Extension(VerifiedToken(claims))) => claims.access[0].name.clone(),
            None => "anonymous".to_string(),
        }
    }

    fn create_test_server(state: AppState) -> TestServer {
        let app = Router::new()
            .route("/v2/", get(claims_handler))
            .route("/v2/*path", get(claims_handler))
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state);
        TestServer::new(app).unwrap()
    }

    // Test 1: exempt path needs no header
    #[tokio::test]
    async fn test_auth_middleware_skips_exempt_path() {
        let server = create_test_server(create_test_state());

        let response = server.get("/v2/").await;
        response.assert_status_ok();
        assert_eq!(response.text(), "anonymous");
    }

    // Test 2: protected path without header is rejected
    #[tokio::test]
    async fn test_auth_middleware_rejects_no_auth() {
        let server = create_test_server(create_test_state());

        let response = server.get("/v2/_catalog").await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Missing authorization header");
    }

    // Test 3: verified claims reach the handler
    #[tokio::test]
    async fn test_auth_middleware_attaches_claims() {
        let state = create_test_state();
        let token = state.issuer.issue("repository:library/ubuntu:pull").unwrap();
        let server = create_test_server(state);

        let response = server
            .get("/v2/library/ubuntu/tags/list")
            .add_header(
                header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
            )
            .await;

        response.assert_status_ok();
        assert_eq!(response.text(), "library/ubuntu");
    }

    // Test 4: token issued under the self-auth-service name reaches the handler
    #[tokio::test]
    async fn test_auth_middleware_self_auth_service_issuer() {
        let state = create_test_state();
        let claims = TokenClaims::self_issued(
            &state.identity.self_auth_service,
            AccessClaim::from_scope("repository:team/api:pull").unwrap(),
            chrono::Utc::now().timestamp(),
        );
        let token = state.issuer.sign(&claims).unwrap();
        let server = create_test_server(state);

        let response = server
            .get("/v2/team/api/manifests/v1")
            .add_header(
                header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
            )
            .await;

        response.assert_status_ok();
        assert_eq!(response.text(), "team/api");
    }

    // Test 5: AuthResponse renders a JSON error body
    #[test]
    fn test_auth_response_from_error() {
        let resp = AuthResponse::from_error(AuthError::InvalidToken);
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
        assert_eq!(resp.message, "Invalid token");

        let resp = AuthResponse::authentication_failed();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.message, "Authentication failed");
    }

    // Test 6: logging middleware passes the response through
    #[tokio::test]
    async fn test_logging_middleware_passthrough() {
        let app = Router::new()
            .route("/ping", get(|| async { (StatusCode::ACCEPTED, "pong") }))
            .layer(middleware::from_fn(logging_middleware));
        let server = TestServer::new(app).unwrap();

        let response = server.get("/ping").await;
        response.assert_status(StatusCode::ACCEPTED);
        assert_eq!(response.text(), "pong");
    }
}
