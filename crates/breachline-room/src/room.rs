//! The persisted room document and the tool picks inside it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use breachline_economy::UserProfile;
use breachline_protocol::{RoomCode, Uid};
use breachline_store::DocKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{RoomConfig, RoomError, RoomState};

/// Collection holding one [`Room`] per code.
pub const ROOMS: &str = "game_rooms";

/// The only game mode rooms are created with.
pub const GAME_MODE_PVP_PRIVATE: &str = "pvp_private";

/// Store key of a room.
pub fn room_key(code: &RoomCode) -> DocKey {
    DocKey::new(ROOMS, code.as_str())
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// A player as seen by the room, copied from their profile at join time.
///
/// Later purchases do not change a `PlayerRef` already in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRef {
    pub uid: Uid,
    pub username: String,
    pub status: String,
    pub prestige: u64,
}

impl From<&UserProfile> for PlayerRef {
    fn from(profile: &UserProfile) -> Self {
        Self {
            uid: profile.uid.clone(),
            username: profile.username.clone(),
            status: profile.status.clone(),
            prestige: profile.prestige,
        }
    }
}

/// Per-player match state, created for every player when the game starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMatchState {
    /// 0 to 100.
    pub system_integrity: u8,
    /// Write-once. `null` until the player submits.
    pub loadout: Option<Loadout>,
    /// Tool id to cooldown state. Reserved for the combat layer.
    #[serde(default)]
    pub cooldowns: BTreeMap<String, Value>,
}

impl PlayerMatchState {
    pub fn new(system_integrity: u8) -> Self {
        Self {
            system_integrity,
            loadout: None,
            cooldowns: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

macro_rules! tool_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant,)+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = RoomError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|tool| tool.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| RoomError::InvalidLoadout(format!("unknown {} tool {s:?}", $kind)))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

tool_enum! {
    /// Offensive tools.
    AttackTool, "attack" {
        Worm => "Worm",
        Trojan => "Trojan",
        BruteForce => "BruteForce",
        Ddos => "DDoS",
    }
}

tool_enum! {
    /// Defensive tools.
    DefenseTool, "defense" {
        Firewall => "Firewall",
        HoneyPot => "HoneyPot",
        AntiVirus => "AntiVirus",
        Encryption => "Encryption",
    }
}

/// Two distinct attack tools and two distinct defense tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loadout {
    pub attack: [AttackTool; 2],
    pub defense: [DefenseTool; 2],
}

impl Loadout {
    /// Validates raw tool names from a request.
    ///
    /// # Errors
    /// Returns [`RoomError::InvalidLoadout`] unless each list holds exactly
    /// two distinct tools of the right kind.
    pub fn parse<A, D>(attack: &[A], defense: &[D]) -> Result<Self, RoomError>
    where
        A: AsRef<str>,
        D: AsRef<str>,
    {
        Ok(Self {
            attack: pick_two(attack, "attack")?,
            defense: pick_two(defense, "defense")?,
        })
    }
}

fn pick_two<T, S>(raw: &[S], kind: &str) -> Result<[T; 2], RoomError>
where
    T: FromStr<Err = RoomError> + PartialEq,
    S: AsRef<str>,
{
    let [first, second] = raw else {
        return Err(RoomError::InvalidLoadout(format!(
            "you must select 2 {kind} tools, got {}",
            raw.len()
        )));
    };
    let first: T = first.as_ref().parse()?;
    let second: T = second.as_ref().parse()?;
    if first == second {
        return Err(RoomError::InvalidLoadout(format!(
            "{kind} tools must be distinct"
        )));
    }
    Ok([first, second])
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A room document (`game_rooms/<code>`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub code: RoomCode,
    pub host_id: Uid,
    pub state: RoomState,
    pub max_players: usize,
    /// Join order. Unique by uid.
    pub players: Vec<PlayerRef>,
    /// Created in full when the room enters [`RoomState::Loadout`].
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub game_data: BTreeMap<Uid, PlayerMatchState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<Uid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_reason: Option<String>,
    /// Unix milliseconds.
    pub created_at: u64,
    pub game_mode: String,
}

impl Room {
    /// A fresh room in [`RoomState::Waiting`] with the host as sole player.
    pub fn new(code: RoomCode, host: PlayerRef, config: &RoomConfig, created_at: u64) -> Self {
        Self {
            code,
            host_id: host.uid.clone(),
            state: RoomState::Waiting,
            max_players: config.max_players,
            players: vec![host],
            game_data: BTreeMap::new(),
            winner_id: None,
            win_reason: None,
            created_at,
            game_mode: GAME_MODE_PVP_PRIVATE.to_string(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    pub fn has_player(&self, uid: &Uid) -> bool {
        self.players.iter().any(|p| &p.uid == uid)
    }

    /// Whether every player would have a loadout once `submitter` has one.
    pub fn ready_after(&self, submitter: &Uid) -> bool {
        self.players.iter().all(|p| {
            &p.uid == submitter
                || self
                    .game_data
                    .get(&p.uid)
                    .is_some_and(|state| state.loadout.is_some())
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn player(uid: &str) -> PlayerRef {
        PlayerRef {
            uid: Uid::new(uid).unwrap(),
            username: uid.to_uppercase(),
            status: "Skid 🎓".into(),
            prestige: 0,
        }
    }

    #[test]
    fn test_loadout_parse_accepts_two_distinct_per_kind() {
        let loadout = Loadout::parse(&["Worm", "DDoS"], &["Firewall", "Encryption"]).unwrap();
        assert_eq!(loadout.attack, [AttackTool::Worm, AttackTool::Ddos]);
        assert_eq!(loadout.defense, [DefenseTool::Firewall, DefenseTool::Encryption]);
    }

    #[test]
    fn test_loadout_parse_rejects_wrong_count() {
        assert!(Loadout::parse(&["Worm"], &["Firewall", "Encryption"]).is_err());
        assert!(Loadout::parse(&["Worm", "Trojan", "DDoS"], &["Firewall", "Encryption"]).is_err());
        assert!(Loadout::parse::<&str, &str>(&["Worm", "Trojan"], &[]).is_err());
    }

    #[test]
    fn test_loadout_parse_rejects_duplicates() {
        let err = Loadout::parse(&["Worm", "worm"], &["Firewall", "Encryption"]).unwrap_err();
        assert!(err.to_string().contains("distinct"));
    }

    #[test]
    fn test_loadout_parse_rejects_wrong_category() {
        let err = Loadout::parse(&["Worm", "Firewall"], &["HoneyPot", "Encryption"]).unwrap_err();
        assert!(err.to_string().contains("unknown attack tool"));
    }

    #[test]
    fn test_loadout_json_shape() {
        let loadout = Loadout::parse(&["BruteForce", "DDoS"], &["HoneyPot", "AntiVirus"]).unwrap();
        assert_eq!(
            serde_json::to_value(loadout).unwrap(),
            json!({ "attack": ["BruteForce", "DDoS"], "defense": ["HoneyPot", "AntiVirus"] })
        );
    }

    #[test]
    fn test_room_new_document_shape() {
        let room = Room::new(
            RoomCode::parse("ABCDEF").unwrap(),
            player("alice"),
            &RoomConfig::default(),
            1_700_000_000_000,
        );
        let value = serde_json::to_value(&room).unwrap();

        assert_eq!(value["code"], "ABCDEF");
        assert_eq!(value["hostId"], "alice");
        assert_eq!(value["state"], "waiting");
        assert_eq!(value["maxPlayers"], 2);
        assert_eq!(value["gameMode"], "pvp_private");
        assert_eq!(value["players"][0]["uid"], "alice");
        assert!(value.get("gameData").is_none());
    }

    #[test]
    fn test_match_state_json_keeps_null_loadout() {
        let value = serde_json::to_value(PlayerMatchState::new(100)).unwrap();
        assert_eq!(
            value,
            json!({ "systemIntegrity": 100, "loadout": null, "cooldowns": {} })
        );
    }

    #[test]
    fn test_ready_after_requires_every_other_loadout() {
        let mut room = Room::new(
            RoomCode::parse("ABCDEF").unwrap(),
            player("alice"),
            &RoomConfig::default(),
            0,
        );
        room.players.push(player("bob"));
        for p in &room.players {
            room.game_data.insert(p.uid.clone(), PlayerMatchState::new(100));
        }
        let alice = Uid::new("alice").unwrap();
        let bob = Uid::new("bob").unwrap();

        assert!(!room.ready_after(&alice));

        if let Some(state) = room.game_data.get_mut(&bob) {
            state.loadout = Some(Loadout::parse(&["Worm", "Trojan"], &["Firewall", "HoneyPot"]).unwrap());
        }
        assert!(room.ready_after(&alice));
    }
}
