//! Room lifecycle management for Breachline.
//!
//! A room is a persisted document (`game_rooms/<code>`) that moves through
//! a strict phase sequence:
//!
//! ```text
//! waiting ──startGame──→ loadout ──all loadouts in──→ in_progress ──→ finished
//! ```
//!
//! Every mutation is a single store transaction run by the [`Lobby`], so
//! two players racing to join, or both submitting loadouts at once, are
//! serialized by the store's conflict detection rather than by locks.
//!
//! # Key types
//!
//! - [`Lobby`]: the callable room operations
//! - [`Room`], [`PlayerRef`], [`PlayerMatchState`]: the room document
//! - [`RoomState`]: the phase state machine
//! - [`Loadout`], [`AttackTool`], [`DefenseTool`]: validated tool picks
//! - [`generate_code`]: random room codes

mod code;
mod config;
mod error;
mod manager;
mod room;

pub use code::{generate_code, generate_code_with};
pub use config::{RoomConfig, RoomState};
pub use error::RoomError;
pub use manager::{Lobby, LoadoutOutcome};
pub use room::{
    AttackTool, DefenseTool, GAME_MODE_PVP_PRIVATE, Loadout, PlayerMatchState, PlayerRef, ROOMS,
    Room, room_key,
};
