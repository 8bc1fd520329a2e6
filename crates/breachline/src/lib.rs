//! # Breachline
//!
//! Backend for a two-player hacking duel: private rooms joined by short
//! codes, a host-started loadout phase, and a `$BTC` store for status
//! tiers.
//!
//! Every callable operation runs as one optimistic transaction against a
//! [`Store`](breachline_store::Store), so concurrent joins, loadout picks
//! and purchases never lose an update. Clients speak JSON over WebSocket:
//!
//! ```text
//! WebSocket → Envelope<ClientMessage> → Gateway → Lobby / Ledger → Store
//!                                                                   │
//! RoomSnapshot ←──────────────────── room feed ←────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use breachline::prelude::*;
//!
//! # async fn run() -> Result<(), GatewayError> {
//! let auth = TokenAuthenticator::new();
//! let server = ServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build(Arc::new(MemoryStore::new()), auth)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod gateway;
mod handler;
mod logging;
mod server;

pub use config::ServerConfig;
pub use error::GatewayError;
pub use gateway::Gateway;
pub use logging::{LOG_ENV, LOG_FORMAT_ENV, LogFormat, init_logging};
pub use server::{BreachlineServer, PROTOCOL_VERSION, ServerBuilder};

/// The types most servers need.
pub mod prelude {
    pub use crate::{
        BreachlineServer, Gateway, GatewayError, LogFormat, PROTOCOL_VERSION, ServerBuilder,
        ServerConfig, init_logging,
    };
    pub use breachline_economy::{BtcAmount, Ledger, StatusTier, UserProfile};
    pub use breachline_protocol::{
        CallError, ClientMessage, Envelope, ErrorCode, Operation, Response, RoomCode,
        ServerMessage, Uid,
    };
    pub use breachline_room::{Lobby, RoomConfig, RoomState};
    pub use breachline_session::{Authenticator, TokenAuthenticator};
    pub use breachline_store::{MemoryStore, RetryPolicy, Store};
}
