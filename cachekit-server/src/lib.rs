//! # Cachekit Server
//!
//! A long-running socket listener hosting a local [`CacheService`] for
//! remote cache clients. Each accepted connection is served by its own
//! task that repeatedly reads requests and dispatches them against the
//! service; reconnection is entirely the client's responsibility.

mod connection;

use cachekit_core::{CacheConfig, CacheError, CacheService};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// The cache server: binds a listening socket and serves remote clients
/// against a cache directory it owns.
///
/// # Example
///
/// ```rust,no_run
/// use cachekit_server::CacheServer;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = CacheServer::bind("/var/cache/server", "127.0.0.1", 9552).await?;
///     server.run().await;
///     Ok(())
/// }
/// ```
pub struct CacheServer {
    listener: TcpListener,
    service: std::sync::Arc<CacheService>,
    cache_dir: PathBuf,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl CacheServer {
    /// Creates the cache directory if absent, initializes the local cache
    /// service rooted there and binds the listening socket. Binding
    /// eagerly lets callers pass port `0` and read the assigned port back
    /// from [`local_addr`](CacheServer::local_addr).
    pub async fn bind(
        cache_dir: impl Into<PathBuf>,
        host: &str,
        port: u16,
    ) -> Result<Self, CacheError> {
        let cache_dir = cache_dir.into();
        std::fs::create_dir_all(&cache_dir)?;
        let service = CacheService::new(CacheConfig::local(&cache_dir, false));
        let listener = TcpListener::bind((host, port)).await?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            listener,
            service,
            cache_dir,
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, CacheError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until shut down, one serving task per
    /// connection. Commits all caches before returning.
    pub async fn run(mut self) {
        match self.listener.local_addr() {
            Ok(addr) => tracing::info!("Cache server ready for requests on {addr}."),
            Err(_) => tracing::info!("Cache server ready for requests."),
        }
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            tracing::debug!("Accepted connection from {peer}.");
                            let service = std::sync::Arc::clone(&self.service);
                            let cache_dir = self.cache_dir.clone();
                            tokio::spawn(connection::handle(service, cache_dir, stream, peer));
                        }
                        Err(e) => {
                            tracing::error!("Could not accept a connection: {e}");
                        }
                    }
                }
                _ = self.shutdown_rx.changed() => {
                    tracing::info!("Cache server shutting down.");
                    break;
                }
            }
        }
        self.service.commit_all_caches();
    }

    /// Starts the accept loop as a background task and returns a handle
    /// for shutting it down.
    pub fn run_in_background(self) -> ServerHandle {
        let shutdown_tx = self.shutdown_tx.clone();
        let service = std::sync::Arc::clone(&self.service);
        let task = tokio::spawn(self.run());
        ServerHandle {
            shutdown_tx,
            service,
            task,
        }
    }
}

/// Handle to a cache server running in the background.
pub struct ServerHandle {
    shutdown_tx: watch::Sender<bool>,
    service: std::sync::Arc<CacheService>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Signals the accept loop to stop, commits all caches and waits for
    /// the server task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        self.service.commit_all_caches();
        if let Err(e) = self.task.await {
            tracing::error!("Cache server task ended abnormally: {e}");
        }
    }
}
