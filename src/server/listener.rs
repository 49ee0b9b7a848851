//! Hub server listener
//!
//! Handles the TCP accept loop and spawns connection handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::auth::Authenticator;
use crate::error::Result;
use crate::hub::Hub;
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;

/// Broadcast hub server
pub struct HubServer<A: Authenticator> {
    config: ServerConfig,
    hub: Arc<Hub<A>>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl<A: Authenticator> HubServer<A> {
    /// Create a new server around a hub
    pub fn new(config: ServerConfig, hub: Hub<A>) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            hub: Arc::new(hub),
            connection_semaphore,
        }
    }

    /// Get a reference to the hub
    pub fn hub(&self) -> &Arc<Hub<A>> {
        &self.hub
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server
    ///
    /// Runs until binding fails; there is no shutdown signal.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Bind the configured address and serve until `shutdown` completes
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_until(listener, shutdown).await
    }

    /// Serve an already bound listener until `shutdown` completes
    ///
    /// Connections accepted before shutdown keep running until their peers
    /// disconnect.
    pub async fn serve_until<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "Hub server listening");

        let stats_handle = self.spawn_stats_task();

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
            }
            _ = self.accept_loop(&listener) => {}
        }

        if let Some(handle) = stats_handle {
            handle.abort();
        }

        Ok(())
    }

    async fn accept_loop(&self, listener: &TcpListener) {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit: Option<OwnedSemaphorePermit> = match self.connection_semaphore {
            Some(ref sem) => match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            },
            None => None,
        };

        tracing::debug!(peer = %peer_addr, "New connection");

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::error!(peer = %peer_addr, error = %e, "Failed to configure socket");
                return;
            }
        }

        let hub = Arc::clone(&self.hub);
        let max_frame_len = self.config.max_frame_len;

        tokio::spawn(async move {
            // held for the lifetime of the connection
            let _permit = permit;
            let connection = Connection::new(socket, Some(peer_addr), hub, max_frame_len);

            if let Err(e) = connection.run().await {
                tracing::debug!(peer = %peer_addr, error = %e, "Connection error");
            }
        });
    }

    /// Spawn a task that logs hub statistics periodically
    ///
    /// Returns `None` when the interval is zero.
    pub fn spawn_stats_task(&self) -> Option<tokio::task::JoinHandle<()>> {
        let interval = self.config.stats_interval;
        if interval.is_zero() {
            return None;
        }

        let hub = Arc::clone(&self.hub);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let stats = hub.stats();
                tracing::info!(
                    active = stats.active_connections,
                    opened = stats.connections_opened,
                    accepted = stats.messages_accepted,
                    rejected = stats.rejected(),
                    deliveries = stats.deliveries,
                    evictions = stats.evictions,
                    uptime_secs = stats.uptime.as_secs(),
                    "Hub stats"
                );
            }
        }))
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}
