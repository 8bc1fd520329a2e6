//! Wire protocol for Breachline.
//!
//! This crate defines everything that crosses the boundary between the
//! game clients and the server:
//!
//! - **Identifiers** ([`Uid`], [`RoomCode`]) shared by every layer.
//! - **Error taxonomy** ([`ErrorCode`], [`CallError`]): the stable set of
//!   failure kinds clients can branch on.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`], [`Operation`],
//!   [`Response`]): the frames exchanged over a connection.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames become bytes.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope<ClientMessage>) → Gateway (operations)
//! ```

mod codec;
mod error;
mod message;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use message::{
    Ack, CallError, CallOutcome, CatalogEntry, ClientMessage, Envelope,
    Operation, Response, RoomCodeReply, ServerMessage,
};
pub use types::{ErrorCode, RoomCode, Uid};
