//! TCP listener running one worker per accepted connection.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::RpcError;
use crate::handlers::RequestRouter;

use super::worker::{handle_connection, reject_busy, Outcome, WorkerOptions};

/// Connection metrics for monitoring.
#[derive(Debug, Default)]
pub struct ConnectionMetrics {
    /// Total requests processed.
    pub requests_total: AtomicU64,
    /// Requests answered with an error or not answered at all.
    pub requests_failed: AtomicU64,
    /// Connections turned away at the concurrency limit.
    pub connections_rejected: AtomicU64,
    /// Currently active connections.
    pub active_connections: AtomicUsize,
}

impl ConnectionMetrics {
    /// Create new connection metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment request count.
    pub fn record_request(&self, success: bool) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.requests_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get total request count.
    pub fn total_requests(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Get failed request count.
    pub fn failed_requests(&self) -> u64 {
        self.requests_failed.load(Ordering::Relaxed)
    }

    /// Get rejected connection count.
    pub fn rejected(&self) -> u64 {
        self.connections_rejected.load(Ordering::Relaxed)
    }

    /// Get active connection count.
    pub fn active(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }
}

/// RPC server.
///
/// The routing table is injected at construction and never changes while
/// serving.
pub struct RpcServer {
    listener: TcpListener,
    router: Arc<RequestRouter>,
    options: Arc<WorkerOptions>,
    metrics: Arc<ConnectionMetrics>,
    /// Caps concurrently served connections
    connection_semaphore: Arc<Semaphore>,
    max_connections: usize,
}

impl RpcServer {
    /// Bind the configured address.
    pub async fn bind(settings: &Settings, router: RequestRouter) -> Result<Self, RpcError> {
        let addr = settings.server.address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| RpcError::Socket {
                message: format!("Failed to bind to {}: {}", addr, e),
            })?;

        let max_connections = settings.limits.max_concurrent_connections;
        info!(max_connections, "Connection limiting enabled");

        let options = Arc::new(WorkerOptions {
            socket_timeout: settings.limits.socket_timeout(),
            expose_handler_errors: settings.protocol.expose_handler_errors,
        });

        let server = Self {
            listener,
            router: Arc::new(router),
            options,
            metrics: Arc::new(ConnectionMetrics::new()),
            connection_semaphore: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        };

        info!(addr = %server.local_addr()?, "Listener bound");
        Ok(server)
    }

    /// The bound address (useful when binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, RpcError> {
        self.listener.local_addr().map_err(|e| RpcError::Socket {
            message: format!("Failed to read local address: {}", e),
        })
    }

    /// Get connection metrics.
    pub fn metrics(&self) -> Arc<ConnectionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Accept connections until `shutdown` is notified.
    ///
    /// Workers already running are left to finish; see [`Self::wait_for_drain`].
    pub async fn run(&self, shutdown: Arc<Notify>) -> Result<(), RpcError> {
        info!("Listener running, waiting for connections...");

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => self.spawn_worker(stream, peer),
                        Err(e) => {
                            warn!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = shutdown.notified() => {
                    info!("Shutdown signal received, stopping listener");
                    break;
                }
            }
        }

        Ok(())
    }

    fn spawn_worker(&self, stream: tokio::net::TcpStream, peer: SocketAddr) {
        let _ = stream.set_nodelay(true);

        let permit = match self.connection_semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!(
                    max = self.max_connections,
                    peer = %peer,
                    "Connection limit reached, rejecting connection"
                );
                self.metrics
                    .connections_rejected
                    .fetch_add(1, Ordering::Relaxed);
                tokio::spawn(reject_busy(stream, self.options.socket_timeout));
                return;
            }
        };

        let router = Arc::clone(&self.router);
        let options = Arc::clone(&self.options);
        let metrics = Arc::clone(&self.metrics);

        metrics.active_connections.fetch_add(1, Ordering::Relaxed);
        debug!(peer = %peer, active = metrics.active(), "New connection accepted");

        tokio::spawn(async move {
            let _permit = permit;
            let outcome = handle_connection(stream, router, options).await;

            metrics.record_request(outcome == Outcome::Served);
            metrics.active_connections.fetch_sub(1, Ordering::Relaxed);
            debug!(
                peer = %peer,
                active = metrics.active(),
                ?outcome,
                "Connection closed"
            );
        });
    }

    /// Wait for all active connections to drain.
    ///
    /// Returns immediately if there are no active connections.
    pub async fn wait_for_drain(&self) {
        let poll_interval = std::time::Duration::from_millis(100);

        while self.metrics.active() > 0 {
            debug!(active = self.metrics.active(), "Waiting for connections to drain");
            tokio::time::sleep(poll_interval).await;
        }

        info!("All connections drained");
    }
}
