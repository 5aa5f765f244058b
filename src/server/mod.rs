//! HTTP surface of the relay: routes, the auth gate middleware and the
//! listener lifecycle.

pub mod middleware;
pub mod router;

pub use middleware::{auth_middleware, logging_middleware, AuthResponse, VerifiedToken};
pub use router::{build_router, AppState, HealthResponse};

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::{Config, ServerConfig};
use crate::error::AppError;
use crate::upstream::HttpForwarder;

/// The relay's HTTP listener
///
/// Owns the wired application state until `run` hands it to axum.
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Validate the configuration and wire the relay against the real upstream
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        config.validate()?;

        let forwarder = HttpForwarder::new(&config.upstream)?;
        let state = AppState::new(config, Arc::new(forwarder));

        Ok(Self::new(config.server.clone(), state))
    }

    /// Socket address built from the configured host and port
    pub fn bind_addr(&self) -> Result<SocketAddr, ServerError> {
        let ip: IpAddr = self
            .config
            .host
            .parse()
            .map_err(|_| ServerError::InvalidHost(self.config.host.clone()))?;
        Ok(SocketAddr::new(ip, self.config.port))
    }

    /// Serve requests until `shutdown` resolves, then drain in-flight requests
    pub async fn run(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let addr = self.bind_addr()?;
        let app = build_router(self.state).layer(TraceLayer::new_for_http());

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("{}: {}", addr, e)))?;
        let local_addr = listener.local_addr().unwrap_or(addr);

        tracing::info!(addr = %local_addr, "Relay listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        tracing::info!("Relay stopped accepting connections");
        Ok(())
    }
}

/// Listener failures
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid listen host: {0}")]
    InvalidHost(String),

    #[error("Failed to bind to address: {0}")]
    Bind(String),

    #[error("Server error: {0}")]
    Serve(String),
}
