//! Identifiers and the error taxonomy shared by every Breachline layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Uid
// ---------------------------------------------------------------------------

/// The identity provider's user id.
///
/// Opaque to Breachline apart from two rules: it is never empty and it
/// never contains `/` or `.`, because it is used both as a document id
/// and as a segment of nested field paths (`gameData.<uid>.loadout`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uid(String);

impl Uid {
    /// Validates and wraps a raw user id.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidUid`] if `raw` is empty or contains
    /// `/` or `.`.
    pub fn new(raw: impl Into<String>) -> Result<Self, ProtocolError> {
        let raw = raw.into();
        if raw.is_empty() || raw.contains(['/', '.']) {
            return Err(ProtocolError::InvalidUid(raw));
        }
        Ok(Self(raw))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Uid {
    type Error = ProtocolError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<Uid> for String {
    fn from(uid: Uid) -> Self {
        uid.0
    }
}

impl FromStr for Uid {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// A short, human-shareable room identifier such as `K7QX2M`.
///
/// Always stored in canonical (uppercase) form. Parsing is
/// case-insensitive, so `k7qx2m` and `K7QX2M` name the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Number of characters in a room code.
    pub const LENGTH: usize = 6;

    /// Symbols a room code may contain: uppercase letters without the
    /// ambiguous `O`, and the digits 1-9 (no `0`).
    pub const ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNPQRSTUVWXYZ123456789";

    /// Parses user input into a canonical room code.
    ///
    /// Surrounding whitespace is ignored and letters are uppercased.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidRoomCode`] if the normalized input
    /// is not exactly [`Self::LENGTH`] symbols from [`Self::ALPHABET`].
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        let canonical = input.trim().to_ascii_uppercase();
        let well_formed = canonical.len() == Self::LENGTH
            && canonical.bytes().all(|b| Self::ALPHABET.contains(&b));
        if !well_formed {
            return Err(ProtocolError::InvalidRoomCode(input.to_string()));
        }
        Ok(Self(canonical))
    }

    /// Builds a code from alphabet positions, one per character.
    ///
    /// Positions wrap modulo the alphabet size, so every input produces a
    /// valid code. Used by the room-code generator.
    pub fn from_alphabet_indices(indices: [usize; Self::LENGTH]) -> Self {
        let code = indices
            .iter()
            .map(|&i| char::from(Self::ALPHABET[i % Self::ALPHABET.len()]))
            .collect();
        Self(code)
    }

    /// Returns the canonical code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl FromStr for RoomCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// The stable failure taxonomy every callable operation reports.
///
/// Serialized in kebab-case (`"failed-precondition"`), which is what the
/// browser client switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// The caller has no authenticated identity.
    Unauthenticated,
    /// A referenced entity (item, room, profile) does not exist.
    NotFound,
    /// The request is malformed (wrong loadout size, unknown tool).
    InvalidArgument,
    /// The request is well formed but the current state forbids it
    /// (room full, wrong phase, insufficient balance).
    FailedPrecondition,
    /// Authenticated but not entitled (non-host start, guest purchase).
    PermissionDenied,
    /// An invariant was violated or the store gave up retrying.
    Internal,
}

impl ErrorCode {
    /// Returns the wire name of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::NotFound => "not-found",
            Self::InvalidArgument => "invalid-argument",
            Self::FailedPrecondition => "failed-precondition",
            Self::PermissionDenied => "permission-denied",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
