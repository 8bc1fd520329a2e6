//! Frames exchanged between clients and the gateway.
//!
//! Every frame on the wire is an [`Envelope`] around either a
//! [`ClientMessage`] or a [`ServerMessage`]. Callable operations travel
//! inside [`ClientMessage::Call`] and are answered by exactly one
//! [`ServerMessage::Reply`] carrying the same `id`.

use serde::{Deserialize, Serialize};

use crate::{ErrorCode, RoomCode, Uid};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Top-level wrapper for every frame.
///
/// `seq` is per-direction and per-connection; `timestamp` is milliseconds
/// since the sender's connection started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<M> {
    /// Auto-incrementing sequence number.
    pub seq: u64,
    /// Milliseconds since the connection started.
    pub timestamp: u64,
    /// The frame content.
    pub message: M,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// A callable operation and its request fields.
///
/// Tool ids and item ids arrive as raw strings and are validated against
/// the closed tool lists and catalog by the gateway, so an unknown value
/// is reported with a proper [`ErrorCode`] instead of a decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Operation {
    /// Buy a status tier or prestige from the catalog.
    Purchase { item_id: String },
    /// Open a new private room hosted by the caller.
    CreateRoom,
    /// Join an existing room by code.
    JoinRoom { room_code: String },
    /// Host-only: move a full room into loadout selection.
    StartGame { room_code: String },
    /// Submit the caller's two attack and two defense tools.
    SelectLoadout {
        room_code: String,
        attack_tools: Vec<String>,
        defense_tools: Vec<String>,
    },
    /// List purchasable tiers. Does not require authentication.
    ListCatalog,
}

impl Operation {
    /// Returns the operation's wire name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Purchase { .. } => "purchase",
            Self::CreateRoom => "createRoom",
            Self::JoinRoom { .. } => "joinRoom",
            Self::StartGame { .. } => "startGame",
            Self::SelectLoadout { .. } => "selectLoadout",
            Self::ListCatalog => "listCatalog",
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// `{ "roomCode": "K7QX2M" }`, returned by `createRoom` and `joinRoom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCodeReply {
    pub room_code: RoomCode,
}

/// `{ "success": true, "message": "..." }`, returned by `purchase`,
/// `startGame` and `selectLoadout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

impl Ack {
    /// A successful acknowledgement with the given message.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// One purchasable tier as shown in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Stable item id to pass to `purchase`.
    pub item_id: String,
    /// Display name; also what `status` is set to.
    pub name: String,
    /// Price in satoshis.
    pub cost_sats: u64,
    /// Prestige gained, for prestige items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prestige_delta: Option<u32>,
}

/// The success payload of a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    RoomCode(RoomCodeReply),
    Ack(Ack),
    Catalog { items: Vec<CatalogEntry> },
}

/// The failure payload of a call: a taxonomy code plus a human message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct CallError {
    pub code: ErrorCode,
    pub message: String,
}

impl CallError {
    /// Builds an error of the given kind.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Either side of a call result, as it appears on the wire:
/// `{"ok": {...}}` or `{"err": {"code": "...", "message": "..."}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallOutcome {
    Ok(Response),
    Err(CallError),
}

impl From<Result<Response, CallError>> for CallOutcome {
    fn from(result: Result<Response, CallError>) -> Self {
        match result {
            Ok(response) => Self::Ok(response),
            Err(error) => Self::Err(error),
        }
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Frames a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Must be the first frame. `token` is the identity provider's
    /// credential; without one the connection stays anonymous.
    Handshake { version: u32, token: Option<String> },

    /// Invoke an operation. The reply carries the same `id`.
    Call { id: u64, call: Operation },

    /// Start receiving [`ServerMessage::RoomSnapshot`] for a room.
    Subscribe { room_code: String },

    /// Stop receiving snapshots for a room.
    Unsubscribe { room_code: String },

    /// Keep-alive; answered with [`ServerMessage::HeartbeatAck`].
    Heartbeat { client_time: u64 },

    /// Client is leaving; the server closes the connection.
    Disconnect { reason: String },
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Frames the server may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Handshake accepted. `uid` is `None` for anonymous connections.
    HandshakeAck { uid: Option<Uid>, server_time: u64 },

    /// Result of a [`ClientMessage::Call`].
    Reply { id: u64, outcome: CallOutcome },

    /// The current room document, pushed on subscribe and after every
    /// committed change.
    RoomSnapshot {
        room_code: RoomCode,
        room: serde_json::Value,
    },

    /// Answer to a heartbeat, for RTT and clock-offset estimation.
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// A connection-level failure not tied to a call id.
    Error { code: ErrorCode, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_select_loadout_json_shape() {
        let op = Operation::SelectLoadout {
            room_code: "ABCDEF".into(),
            attack_tools: vec!["Worm".into(), "Trojan".into()],
            defense_tools: vec!["Firewall".into(), "HoneyPot".into()],
        };
        let json = serde_json::to_value(&op).unwrap();

        assert_eq!(json["op"], "selectLoadout");
        assert_eq!(json["roomCode"], "ABCDEF");
        assert_eq!(json["attackTools"][1], "Trojan");
        assert_eq!(json["defenseTools"][0], "Firewall");
    }

    #[test]
    fn test_operation_unit_variant_json_shape() {
        let json = serde_json::to_value(Operation::CreateRoom).unwrap();
        assert_eq!(json, serde_json::json!({ "op": "createRoom" }));
    }

    #[test]
    fn test_operation_unknown_op_is_rejected() {
        let result: Result<Operation, _> =
            serde_json::from_str(r#"{"op": "deleteRoom", "roomCode": "ABCDEF"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_reply_ok_room_code_json_shape() {
        let msg = ServerMessage::Reply {
            id: 4,
            outcome: CallOutcome::Ok(Response::RoomCode(RoomCodeReply {
                room_code: RoomCode::parse("K7QX2M").unwrap(),
            })),
        };
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "Reply");
        assert_eq!(json["id"], 4);
        assert_eq!(json["outcome"]["ok"]["roomCode"], "K7QX2M");
    }

    #[test]
    fn test_reply_err_json_shape() {
        let msg = ServerMessage::Reply {
            id: 5,
            outcome: CallOutcome::Err(CallError::new(
                ErrorCode::FailedPrecondition,
                "Room is full.",
            )),
        };
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["outcome"]["err"]["code"], "failed-precondition");
        assert_eq!(json["outcome"]["err"]["message"], "Room is full.");
    }

    #[test]
    fn test_untagged_response_decodes_each_shape() {
        let ack: Response =
            serde_json::from_str(r#"{"success": true, "message": "ok"}"#).unwrap();
        assert_eq!(ack, Response::Ack(Ack::ok("ok")));

        let room: Response = serde_json::from_str(r#"{"roomCode": "abcdef"}"#).unwrap();
        assert!(matches!(room, Response::RoomCode(r) if r.room_code.as_str() == "ABCDEF"));

        let catalog: Response = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert_eq!(catalog, Response::Catalog { items: vec![] });
    }

    #[test]
    fn test_handshake_without_token() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "Handshake", "version": 1, "token": null}"#)
                .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Handshake {
                version: 1,
                token: None
            }
        );
    }

    #[test]
    fn test_heartbeat_fields_are_camel_case() {
        let json = serde_json::to_value(ClientMessage::Heartbeat { client_time: 7 }).unwrap();
        assert_eq!(json["clientTime"], 7);
    }

    #[test]
    fn test_unknown_client_message_type_is_rejected() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type": "FlyToMoon", "speed": 9000}"#);
        assert!(result.is_err());
    }
}
