//! Room configuration and state machine.

use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings applied to rooms created by a [`Lobby`](crate::Lobby).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Players a room holds. Fixed at creation.
    pub max_players: usize,

    /// Fresh codes drawn before `createRoom` gives up on collisions.
    pub max_code_attempts: u32,

    /// `systemIntegrity` each player starts the match with.
    pub starting_integrity: u8,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 2,
            max_code_attempts: 8,
            starting_integrity: 100,
        }
    }
}

impl RoomConfig {
    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// - `max_players` at least 1.
    /// - `max_code_attempts` at least 1.
    /// - `starting_integrity` at most 100.
    pub fn validated(mut self) -> Self {
        if self.max_players == 0 {
            warn!("max_players is 0, using 1");
            self.max_players = 1;
        }
        if self.max_code_attempts == 0 {
            warn!("max_code_attempts is 0, using 1");
            self.max_code_attempts = 1;
        }
        if self.starting_integrity > 100 {
            warn!(
                integrity = self.starting_integrity,
                "starting_integrity above 100, clamping"
            );
            self.starting_integrity = 100;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The phase of a room.
///
/// Transitions are strictly ordered, no skipping:
///
/// ```text
/// Waiting → Loadout → InProgress → Finished
/// ```
///
/// - **Waiting**: accepting joins until `maxPlayers` is reached.
/// - **Loadout**: match state exists; players are picking tools.
/// - **InProgress**: every player has a loadout.
/// - **Finished**: a winner was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomState {
    Waiting,
    Loadout,
    InProgress,
    Finished,
}

impl RoomState {
    /// The only state this one may advance to, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Waiting => Some(Self::Loadout),
            Self::Loadout => Some(Self::InProgress),
            Self::InProgress => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }

    /// The persisted name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Loadout => "loadout",
            Self::InProgress => "in_progress",
            Self::Finished => "finished",
        }
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_state_next_follows_strict_order() {
        assert_eq!(RoomState::Waiting.next(), Some(RoomState::Loadout));
        assert_eq!(RoomState::Loadout.next(), Some(RoomState::InProgress));
        assert_eq!(RoomState::InProgress.next(), Some(RoomState::Finished));
        assert_eq!(RoomState::Finished.next(), None);
    }

    #[test]
    fn test_room_state_can_transition_to() {
        assert!(RoomState::Waiting.can_transition_to(RoomState::Loadout));
        assert!(!RoomState::Waiting.can_transition_to(RoomState::InProgress));
        assert!(!RoomState::Loadout.can_transition_to(RoomState::Waiting));
        assert!(!RoomState::Finished.can_transition_to(RoomState::Waiting));
    }

    #[test]
    fn test_room_state_serializes_snake_case() {
        let json = serde_json::to_string(&RoomState::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert_eq!(RoomState::InProgress.to_string(), "in_progress");
    }

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.max_players, 2);
        assert_eq!(config.max_code_attempts, 8);
        assert_eq!(config.starting_integrity, 100);
    }

    #[test]
    fn test_room_config_validated_clamps() {
        let config = RoomConfig {
            max_players: 0,
            max_code_attempts: 0,
            starting_integrity: 250,
        }
        .validated();
        assert_eq!(config.max_players, 1);
        assert_eq!(config.max_code_attempts, 1);
        assert_eq!(config.starting_integrity, 100);
    }
}
