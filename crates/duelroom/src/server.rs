//! `DuelroomServer` builder and server loop.
//!
//! This is the entry point for running a Duelroom server. It ties
//! together all the layers: transport → protocol → session → room.

use std::sync::Arc;
use std::time::Duration;

use duelroom_protocol::{Codec, JsonCodec};
use duelroom_room::{MatchOrchestrator, RoomConfig};
use duelroom_session::SessionHub;
use duelroom_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{DuelroomError, ServerConfig};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The hub and
/// the orchestrator are internally synchronized, so no outer lock is
/// needed.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) hub: Arc<SessionHub>,
    pub(crate) rooms: MatchOrchestrator<Arc<SessionHub>>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a Duelroom server.
///
/// # Example
///
/// ```rust,no_run
/// use duelroom::prelude::*;
///
/// # async fn start() -> Result<(), DuelroomError> {
/// let server = DuelroomServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct DuelroomServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    idle_timeout: Duration,
    seed: Option<u64>,
}

impl DuelroomServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room_config: RoomConfig::default(),
            idle_timeout: Duration::from_secs(60),
            seed: None,
        }
    }

    /// A builder carrying everything in `config`.
    pub fn from_config(config: &ServerConfig) -> Self {
        let builder = Self::new()
            .bind(&config.bind_addr())
            .room_config(config.room.clone())
            .idle_timeout(config.idle_timeout);
        match config.seed {
            Some(seed) => builder.seed(seed),
            None => builder,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the input limits applied to every room.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Closes connections that stay silent for longer than `timeout`.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Makes first-mover assignment reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Binds the listener and assembles the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<DuelroomServer, DuelroomError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let hub = Arc::new(SessionHub::new());
        let rooms = match self.seed {
            Some(seed) => MatchOrchestrator::with_seed(Arc::clone(&hub), seed),
            None => MatchOrchestrator::new(Arc::clone(&hub)),
        }
        .with_config(self.room_config);

        let state = Arc::new(ServerState {
            hub,
            rooms,
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(DuelroomServer { transport, state })
    }
}

impl Default for DuelroomServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Duelroom server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct DuelroomServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl DuelroomServer {
    /// Creates a new builder.
    pub fn builder() -> DuelroomServerBuilder {
        DuelroomServerBuilder::new()
    }
}

impl<C: Codec> DuelroomServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each
    /// one. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), DuelroomError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Duelroom server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
