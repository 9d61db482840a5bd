//! Session manager and HTTP surface for Keepsake.
//!
//! This crate sits between callers and a session backend from
//! [`keepsake_session`]:
//! - [`Manager`] resolves or creates the caller's session
//! - [`cookie`] binds session identifiers to HTTP cookies
//! - [`GcTask`] sweeps idle sessions in the background
//! - [`Server`] exposes sessions over HTTP
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//!
//! use keepsake_server::{Manager, Server, ServerConfig};
//! use keepsake_session::StoreRegistry;
//! use tokio_util::sync::CancellationToken;
//!
//! StoreRegistry::with_memory().install()?;
//! let manager = Manager::new("memory", "keepsake_sid", Duration::from_secs(3600))?;
//!
//! let server = Server::new(manager, ServerConfig::default());
//! server.run(CancellationToken::new()).await?;
//! ```

pub mod config;
pub mod cookie;
pub mod error;
pub mod gc;
pub mod id;
pub mod manager;
pub mod routes;

pub use config::{ConfigError, KeepsakeConfig, ServerConfig, SessionConfig, load_config_file};
pub use error::{Result, ServerError};
pub use gc::GcTask;
pub use id::{OsRngIdGenerator, SessionIdGenerator};
pub use manager::{Manager, StartedSession};
pub use routes::AppState;

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The Keepsake HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
    /// Server configuration.
    config: ServerConfig,
}

impl Server {
    /// Create a new server around a session manager.
    pub fn new(manager: Manager, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(manager),
            config,
        }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let router = routes::routes();
        let router = if self.config.request_logging {
            router.layer(TraceLayer::new_for_http())
        } else {
            router
        };
        router.with_state(self.state.clone())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.config.bind
    }

    /// Run the server until `shutdown` is cancelled.
    ///
    /// The session sweeper runs for the lifetime of the server and is
    /// stopped before this returns.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let addr = self.config.bind;
        let router = self.router();

        info!("Starting server on {}", addr);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;

        let gc = self.state.manager.spawn_gc_with_token(shutdown.child_token());

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.clone().cancelled_owned())
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)));

        gc.shutdown().await;
        info!("Server stopped");
        served
    }
}
