//! Error types for the room layer.

use breachline_protocol::{ErrorCode, ProtocolError, RoomCode, Uid};
use breachline_store::StoreError;

use crate::RoomState;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room code is not 6 symbols from the code alphabet.
    #[error(transparent)]
    InvalidCode(#[from] ProtocolError),

    /// The tool picks are not exactly two distinct known tools per list.
    #[error("{0}")]
    InvalidLoadout(String),

    /// No room exists under the code.
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    /// The caller has no profile document.
    #[error("user profile {0} not found")]
    ProfileNotFound(Uid),

    /// The room has no free player slot.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// Only the host may start the game.
    #[error("only the host can start the game")]
    NotHost,

    /// The room needs every slot filled before it can start.
    #[error("the room is not full yet ({players}/{max_players})")]
    RoomNotFull { players: usize, max_players: usize },

    /// The room is in a phase that does not allow this operation.
    #[error("room is in phase {actual}, expected {expected}")]
    WrongPhase {
        expected: RoomState,
        actual: RoomState,
    },

    /// The caller is in the loadout phase without match state. The room
    /// document is inconsistent.
    #[error("player game data not found for {0}")]
    MissingMatchState(Uid),

    /// Every drawn room code was already taken.
    #[error("no free room code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },

    /// The store failed or gave up retrying.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RoomError {
    /// The taxonomy code reported to callers.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidCode(_) | Self::InvalidLoadout(_) => ErrorCode::InvalidArgument,
            Self::RoomNotFound(_) | Self::ProfileNotFound(_) => ErrorCode::NotFound,
            Self::RoomFull(_) | Self::RoomNotFull { .. } | Self::WrongPhase { .. } => {
                ErrorCode::FailedPrecondition
            }
            Self::NotHost => ErrorCode::PermissionDenied,
            Self::MissingMatchState(_) | Self::CodeSpaceExhausted { .. } | Self::Store(_) => {
                ErrorCode::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_maps_taxonomy() {
        assert_eq!(RoomError::NotHost.code(), ErrorCode::PermissionDenied);
        assert_eq!(
            RoomError::InvalidLoadout("x".into()).code(),
            ErrorCode::InvalidArgument
        );
        assert_eq!(
            RoomError::RoomNotFull { players: 1, max_players: 2 }.code(),
            ErrorCode::FailedPrecondition
        );
        assert_eq!(
            RoomError::Store(StoreError::RetriesExhausted { attempts: 5 }).code(),
            ErrorCode::Internal
        );
    }

    #[test]
    fn test_invalid_code_from_protocol_error() {
        let err: RoomError = RoomCode::parse("nope").unwrap_err().into();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }
}
