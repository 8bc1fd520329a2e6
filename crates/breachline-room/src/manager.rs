//! The lobby: every room operation a player can call.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use breachline_economy::{UserProfile, profile_key};
use breachline_protocol::{RoomCode, Uid};
use breachline_store::{FieldPath, Store, StoreError, Update, to_value};
use tracing::{debug, info, warn};

use crate::{
    Loadout, PlayerMatchState, PlayerRef, Room, RoomConfig, RoomError, RoomState, generate_code,
    room_key,
};

/// Source of candidate room codes.
type CodeSource = Arc<dyn Fn() -> RoomCode + Send + Sync>;

/// What `selectLoadout` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadoutOutcome {
    /// The loadout was written. `match_started` is set when it was the
    /// last one missing and the room moved to `in_progress`.
    Submitted { match_started: bool },
    /// The caller already had a loadout; nothing was written.
    AlreadySubmitted,
}

impl LoadoutOutcome {
    /// The confirmation shown to the player. Identical for first and
    /// repeated submissions.
    pub fn message(self) -> &'static str {
        "Loadout confirmed."
    }
}

/// Creates rooms and drives them through their phases.
///
/// Holds no room state of its own: every operation reads and writes the
/// room document through one store transaction, so any number of lobbies
/// (or server processes) can share a store.
pub struct Lobby<S> {
    store: Arc<S>,
    config: RoomConfig,
    codes: CodeSource,
}

impl<S> Clone for Lobby<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            codes: Arc::clone(&self.codes),
        }
    }
}

impl<S: Store> Lobby<S> {
    pub fn new(store: Arc<S>, config: RoomConfig) -> Self {
        Self {
            store,
            config: config.validated(),
            codes: Arc::new(generate_code),
        }
    }

    /// Replaces the random code generator.
    pub fn with_code_source(mut self, codes: impl Fn() -> RoomCode + Send + Sync + 'static) -> Self {
        self.codes = Arc::new(codes);
        self
    }

    /// Opens a new room hosted by `caller` and returns its code.
    ///
    /// The room is written create-if-absent; a code that is already taken
    /// is redrawn up to `max_code_attempts` times.
    ///
    /// # Errors
    /// - [`RoomError::ProfileNotFound`] if the caller has no profile.
    /// - [`RoomError::CodeSpaceExhausted`] if every drawn code was taken.
    pub async fn create_room(&self, caller: &Uid) -> Result<RoomCode, RoomError> {
        let profile: UserProfile = self
            .store
            .get(&profile_key(caller))
            .await?
            .ok_or_else(|| RoomError::ProfileNotFound(caller.clone()))?
            .decode()?;
        let host = PlayerRef::from(&profile);

        for attempt in 1..=self.config.max_code_attempts {
            let code = (self.codes)();
            let room = Room::new(code.clone(), host.clone(), &self.config, now_millis());
            match self.store.create(&room_key(&code), to_value(&room)?).await {
                Ok(()) => {
                    info!(room_code = %code, host = %caller, "room created");
                    return Ok(code);
                }
                Err(StoreError::AlreadyExists(_)) => {
                    debug!(room_code = %code, attempt, "room code taken, drawing another");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let attempts = self.config.max_code_attempts;
        warn!(attempts, "no free room code");
        Err(RoomError::CodeSpaceExhausted { attempts })
    }

    /// Adds `caller` to the room and returns its canonical code.
    ///
    /// Joining a room the caller is already in succeeds without writing.
    ///
    /// # Errors
    /// - [`RoomError::InvalidCode`] if `room_code` is malformed.
    /// - [`RoomError::RoomNotFound`] / [`RoomError::ProfileNotFound`].
    /// - [`RoomError::RoomFull`] if every slot is taken.
    pub async fn join_room(&self, caller: &Uid, room_code: &str) -> Result<RoomCode, RoomError> {
        let code = RoomCode::parse(room_code)?;
        let key = room_key(&code);
        let user_key = profile_key(caller);

        let joined: Result<bool, RoomError> = self
            .store
            .run_transaction(|tx| {
                let room: Option<Room> = tx.get_as(&key)?;
                let profile: Option<UserProfile> = tx.get_as(&user_key)?;
                let room = room.ok_or_else(|| RoomError::RoomNotFound(code.clone()))?;
                let profile = profile.ok_or_else(|| RoomError::ProfileNotFound(caller.clone()))?;

                if room.has_player(caller) {
                    return Ok(false);
                }
                if room.is_full() {
                    return Err(RoomError::RoomFull(code.clone()));
                }
                let player = to_value(&PlayerRef::from(&profile))?;
                tx.update(&key, Update::new().array_union(FieldPath::field("players"), vec![player]));
                Ok(true)
            })
            .await;

        match &joined {
            Ok(true) => info!(room_code = %code, uid = %caller, "player joined"),
            Ok(false) => debug!(room_code = %code, uid = %caller, "player already in room"),
            Err(e) => debug!(room_code = %code, uid = %caller, error = %e, "join rejected"),
        }
        joined.map(|_| code)
    }

    /// Host-only: moves a full, waiting room into loadout selection.
    ///
    /// Creates the match state of every current player and advances the
    /// phase in a single write.
    ///
    /// # Errors
    /// - [`RoomError::InvalidCode`] / [`RoomError::RoomNotFound`].
    /// - [`RoomError::NotHost`] if the caller did not create the room.
    /// - [`RoomError::RoomNotFull`] if a slot is still open.
    /// - [`RoomError::WrongPhase`] if the game was already started.
    pub async fn start_game(&self, caller: &Uid, room_code: &str) -> Result<(), RoomError> {
        let code = RoomCode::parse(room_code)?;
        let key = room_key(&code);
        let integrity = self.config.starting_integrity;

        let started: Result<(), RoomError> = self
            .store
            .run_transaction(|tx| {
                let room: Room = tx
                    .get_as(&key)?
                    .ok_or_else(|| RoomError::RoomNotFound(code.clone()))?;

                if &room.host_id != caller {
                    return Err(RoomError::NotHost);
                }
                if room.players.len() != room.max_players {
                    return Err(RoomError::RoomNotFull {
                        players: room.players.len(),
                        max_players: room.max_players,
                    });
                }
                if !room.state.can_transition_to(RoomState::Loadout) {
                    return Err(RoomError::WrongPhase {
                        expected: RoomState::Waiting,
                        actual: room.state,
                    });
                }

                let game_data: BTreeMap<&Uid, PlayerMatchState> = room
                    .players
                    .iter()
                    .map(|p| (&p.uid, PlayerMatchState::new(integrity)))
                    .collect();
                tx.update(
                    &key,
                    Update::new()
                        .set(FieldPath::field("state"), to_value(&RoomState::Loadout)?)
                        .set(FieldPath::field("gameData"), to_value(&game_data)?),
                );
                Ok(())
            })
            .await;

        match &started {
            Ok(()) => info!(room_code = %code, host = %caller, "game started"),
            Err(e) => debug!(room_code = %code, uid = %caller, error = %e, "start rejected"),
        }
        started
    }

    /// Records the caller's loadout, starting the match once every player
    /// has one.
    ///
    /// Only the caller's own `gameData.<uid>.loadout` field is written, so
    /// concurrent submissions by different players never overwrite each
    /// other. A caller whose loadout is already set gets
    /// [`LoadoutOutcome::AlreadySubmitted`] and nothing changes.
    ///
    /// # Errors
    /// - [`RoomError::InvalidLoadout`] unless both lists hold two distinct
    ///   tools of the right kind (checked before the store is touched).
    /// - [`RoomError::InvalidCode`] / [`RoomError::RoomNotFound`].
    /// - [`RoomError::WrongPhase`] outside the loadout phase.
    /// - [`RoomError::MissingMatchState`] if the caller has no match state.
    pub async fn select_loadout<A, D>(
        &self,
        caller: &Uid,
        room_code: &str,
        attack_tools: &[A],
        defense_tools: &[D],
    ) -> Result<LoadoutOutcome, RoomError>
    where
        A: AsRef<str>,
        D: AsRef<str>,
    {
        let loadout = Loadout::parse(attack_tools, defense_tools)?;
        let code = RoomCode::parse(room_code)?;
        let key = room_key(&code);
        let loadout_path = FieldPath::new(["gameData", caller.as_str(), "loadout"]);

        let outcome: Result<LoadoutOutcome, RoomError> = self
            .store
            .run_transaction(|tx| {
                let room: Room = tx
                    .get_as(&key)?
                    .ok_or_else(|| RoomError::RoomNotFound(code.clone()))?;

                if room.state != RoomState::Loadout {
                    return Err(RoomError::WrongPhase {
                        expected: RoomState::Loadout,
                        actual: room.state,
                    });
                }
                let own = room
                    .game_data
                    .get(caller)
                    .ok_or_else(|| RoomError::MissingMatchState(caller.clone()))?;
                if own.loadout.is_some() {
                    return Ok(LoadoutOutcome::AlreadySubmitted);
                }

                let mut update = Update::new().set(loadout_path.clone(), to_value(&loadout)?);
                let match_started = room.ready_after(caller);
                if match_started {
                    update = update.set(FieldPath::field("state"), to_value(&RoomState::InProgress)?);
                }
                tx.update(&key, update);
                Ok(LoadoutOutcome::Submitted { match_started })
            })
            .await;

        match &outcome {
            Ok(LoadoutOutcome::Submitted { match_started }) => {
                info!(room_code = %code, uid = %caller, match_started, "loadout submitted");
            }
            Ok(LoadoutOutcome::AlreadySubmitted) => {
                debug!(room_code = %code, uid = %caller, "loadout already submitted");
            }
            Err(e) => debug!(room_code = %code, uid = %caller, error = %e, "loadout rejected"),
        }
        outcome
    }

    /// Reads a room outside any transaction.
    pub async fn room(&self, code: &RoomCode) -> Result<Option<Room>, RoomError> {
        let snapshot = self.store.get(&room_key(code)).await?;
        Ok(snapshot.map(|s| s.decode()).transpose()?)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
