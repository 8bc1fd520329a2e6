//! `BreachlineServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → session → gateway.

use std::net::SocketAddr;
use std::sync::Arc;

use breachline_protocol::{Codec, JsonCodec};
use breachline_room::RoomConfig;
use breachline_session::Authenticator;
use breachline_store::Store;
use breachline_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{Gateway, GatewayError, ServerConfig};

/// The protocol version clients must send in their handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// State shared by every connection task.
pub(crate) struct ServerState<S: Store, A: Authenticator, C: Codec> {
    pub(crate) gateway: Gateway<S>,
    pub(crate) store: Arc<S>,
    pub(crate) auth: A,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for a [`BreachlineServer`].
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use breachline::prelude::*;
///
/// # async fn run() -> Result<(), GatewayError> {
/// let server = ServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(Arc::new(MemoryStore::new()), TokenAuthenticator::new())
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ServerBuilder {
    config: ServerConfig,
    room_config: RoomConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            room_config: RoomConfig::default(),
        }
    }

    /// Sets the listen address, overriding `config.bind_addr`.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn room_config(mut self, room_config: RoomConfig) -> Self {
        self.room_config = room_config;
        self
    }

    /// Binds the listener and assembles the server around `store` and
    /// `auth`. Frames are JSON.
    pub async fn build<S, A>(
        self,
        store: Arc<S>,
        auth: A,
    ) -> Result<BreachlineServer<S, A, JsonCodec>, GatewayError>
    where
        S: Store,
        A: Authenticator,
    {
        let config = self.config.validated();
        let transport = WebSocketTransport::bind(&config.bind_addr).await?;

        let state = Arc::new(ServerState {
            gateway: Gateway::new(Arc::clone(&store), self.room_config),
            store,
            auth,
            codec: JsonCodec,
            config,
        });

        Ok(BreachlineServer { transport, state })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Breachline server. Call [`run()`](Self::run) to serve.
pub struct BreachlineServer<S: Store, A: Authenticator, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S, A, C>>,
}

impl<S, A, C> BreachlineServer<S, A, C>
where
    S: Store,
    A: Authenticator,
    C: Codec + Clone,
{
    /// The address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, GatewayError> {
        Ok(self.transport.local_addr()?)
    }

    /// Accepts connections forever, one handler task each.
    pub async fn run(mut self) -> Result<(), GatewayError> {
        tracing::info!(addr = %self.state.config.bind_addr, "Breachline server running");

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
