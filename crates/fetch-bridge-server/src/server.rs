//! Development server.
//!
//! [`DevServer`] serves the routes of [`build_router`] so the bridge can be
//! exercised against a real HTTP endpoint.

use std::io;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::router::build_router;

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server.
    pub bind_addr: SocketAddr,
    /// Stop on SIGTERM/SIGINT.
    pub graceful_shutdown: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
            graceful_shutdown: true,
        }
    }
}

impl ServerConfig {
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }
}

/// Development HTTP server.
#[derive(Debug, Clone, Default)]
pub struct DevServer {
    config: ServerConfig,
}

impl DevServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot bind to the address.
    pub async fn run(self) -> io::Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!(addr = %listener.local_addr()?, "Starting development server");

        let app = build_router();
        if self.config.graceful_shutdown {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        } else {
            axum::serve(listener, app).await?;
        }

        info!("Server shutdown complete");
        Ok(())
    }

    /// Start a server on an ephemeral port and return a handle to it.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start_test() -> io::Result<TestHandle> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let handle = tokio::spawn(async move {
            axum::serve(listener, build_router())
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        Ok(TestHandle {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle,
        })
    }
}

/// Handle for a test server instance.
pub struct TestHandle {
    addr: SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<io::Result<()>>,
}

impl TestHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// URL of `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Shutdown the server gracefully.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}

/// Wait for SIGTERM or SIGINT.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
