//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use registry_auth_relay::config::Config;
use registry_auth_relay::server::AppState;
use registry_auth_relay::upstream::HttpForwarder;

/// Signing secret shared by test relays
pub const TEST_SECRET: &str = "integration-test-secret";

/// Externally visible URL of test relays
pub const SELF_REGISTRY: &str = "https://proxy.example.com";

/// Basic credential for `user:pass`
pub const USER_PASS_BASIC: &str = "Basic dXNlcjpwYXNz";

/// Create a relay configuration pointing both upstream URLs at `upstream_uri`
pub fn create_test_config(upstream_uri: &str) -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.upstream.registry = upstream_uri.to_string();
    config.upstream.auth_service = upstream_uri.to_string();
    config.relay.self_registry = SELF_REGISTRY.to_string();
    config.relay.server_secret = Some(TEST_SECRET.to_string());
    config
}

/// Create a test application state backed by the HTTP forwarder
pub fn create_test_state(config: &Config) -> AppState {
    let forwarder = HttpForwarder::new(&config.upstream).expect("Failed to create forwarder");
    AppState::new(config, Arc::new(forwarder))
}

/// Sign a token as some other authority would
pub fn foreign_token(issuer: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &serde_json::json!({
            "iss": issuer,
            "aud": "registry.docker.io",
            "sub": "someone",
            "iat": now,
            "nbf": now,
            "exp": now + 300,
            "access": [{"type": "repository", "name": "library/ubuntu", "actions": ["pull"]}]
        }),
        &jsonwebtoken::EncodingKey::from_secret(b"upstream-authority-secret"),
    )
    .expect("Failed to sign foreign token")
}

/// Run a test server in the background and return the address
/// The server will be shut down when the returned shutdown sender is dropped or sent
pub async fn run_test_server(
    state: AppState,
) -> (std::net::SocketAddr, tokio::sync::oneshot::Sender<()>) {
    use tokio::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local address");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let app = registry_auth_relay::server::build_router(state)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("Server error");
    });

    // Give the server a moment to start (100ms is sufficient for slow CI systems)
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    (addr, shutdown_tx)
}
