//! Network module with deferred startup lifecycle.
//!
//! `new()` captures configuration and the CA server, `start()` binds the
//! TCP listener, and `serve()` starts accepting connections. Binding before
//! serving lets callers learn the OS-assigned port first.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use super::config::NetworkConfig;
use super::handlers::{
    enroll_handler, get_identity_handler, health_handler, liveness_handler, reenroll_handler,
    AppState,
};
use super::middleware::build_http_layers;
use crate::ca::CaServer;
use crate::config::ServerConfig;

/// Manages the HTTP server lifecycle.
pub struct NetworkModule {
    config: NetworkConfig,
    server: Arc<CaServer>,
    listener: Option<TcpListener>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, server: Arc<CaServer>) -> Self {
        Self {
            config,
            server,
            listener: None,
        }
    }

    /// Creates a module from the network section of the server config.
    #[must_use]
    pub fn from_config(config: &ServerConfig, server: Arc<CaServer>) -> Self {
        Self::new(config.network.clone(), server)
    }

    /// Assembles the axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            server: Arc::clone(&self.server),
            config: Arc::new(self.config.clone()),
            start_time: Instant::now(),
        };
        routes(state).layer(build_http_layers(&self.config))
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves requests until `shutdown` resolves, then waits for in-flight
    /// requests to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first, or if the server
    /// encounters a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let router = self.build_router();

        info!(cas = ?self.server.ca_names(), "serving HTTP connections");
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("HTTP server stopped");
        Ok(())
    }
}

/// Routes served by the module, without transport middleware.
///
/// Routes:
/// - `GET /health` -- served CAs and uptime
/// - `GET /health/live` -- liveness check
/// - `POST /api/v1/enroll` -- password-authenticated enrollment
/// - `POST /api/v1/reenroll` -- token-authenticated re-enrollment
/// - `GET /api/v1/identities/{id}` -- identity lookup for registrars
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/api/v1/enroll", post(enroll_handler))
        .route("/api/v1/reenroll", post(reenroll_handler))
        .route("/api/v1/identities/{id}", get(get_identity_handler))
        .with_state(state)
}
