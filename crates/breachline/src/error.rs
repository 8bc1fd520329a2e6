//! Unified error type for the Breachline server.

use breachline_economy::EconomyError;
use breachline_protocol::ProtocolError;
use breachline_room::RoomError;
use breachline_session::SessionError;
use breachline_store::StoreError;
use breachline_transport::TransportError;

/// Top-level error wrapping every layer's error.
///
/// Connection handlers and the server loop return this; callable
/// operations never do, since their failures are reported to the client as
/// a [`CallError`](breachline_protocol::CallError) instead.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Binding, accepting, sending or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded, or broke the protocol.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The handshake token was rejected.
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Economy(#[from] EconomyError),
}
