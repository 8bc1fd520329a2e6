//! Dispatch of callable operations.
//!
//! The [`Gateway`] is the only place that knows which domain service backs
//! which [`Operation`] and how domain errors become [`CallError`]s. It has
//! no network dependency: the connection handler feeds it decoded calls
//! and writes back whatever it returns.

use std::sync::Arc;

use breachline_economy::{EconomyError, Ledger, StatusTier};
use breachline_protocol::{
    Ack, CallError, CatalogEntry, ErrorCode, Operation, Response, RoomCodeReply, Uid,
};
use breachline_room::{Lobby, RoomConfig, RoomError};
use breachline_store::Store;
use tracing::{debug, warn};

/// Routes operations to the lobby and the ledger.
pub struct Gateway<S> {
    lobby: Lobby<S>,
    ledger: Ledger<S>,
}

impl<S> Clone for Gateway<S> {
    fn clone(&self) -> Self {
        Self {
            lobby: self.lobby.clone(),
            ledger: self.ledger.clone(),
        }
    }
}

impl<S: Store> Gateway<S> {
    pub fn new(store: Arc<S>, room_config: RoomConfig) -> Self {
        Self {
            lobby: Lobby::new(Arc::clone(&store), room_config),
            ledger: Ledger::new(store),
        }
    }

    pub fn lobby(&self) -> &Lobby<S> {
        &self.lobby
    }

    /// Executes `op` on behalf of `caller`.
    ///
    /// `caller` is `None` on anonymous connections; every operation other
    /// than `listCatalog` then fails with [`ErrorCode::Unauthenticated`].
    pub async fn call(&self, caller: Option<&Uid>, op: Operation) -> Result<Response, CallError> {
        let name = op.name();
        let result = match (op, caller) {
            (Operation::ListCatalog, _) => Ok(catalog()),
            (_, None) => Err(CallError::new(
                ErrorCode::Unauthenticated,
                "You must be signed in to do that.",
            )),
            (Operation::Purchase { item_id }, Some(uid)) => self
                .ledger
                .purchase(uid, &item_id)
                .await
                .map(|purchase| Response::Ack(Ack::ok(purchase.message())))
                .map_err(economy_failure),
            (Operation::CreateRoom, Some(uid)) => self
                .lobby
                .create_room(uid)
                .await
                .map(|room_code| Response::RoomCode(RoomCodeReply { room_code }))
                .map_err(room_failure),
            (Operation::JoinRoom { room_code }, Some(uid)) => self
                .lobby
                .join_room(uid, &room_code)
                .await
                .map(|room_code| Response::RoomCode(RoomCodeReply { room_code }))
                .map_err(room_failure),
            (Operation::StartGame { room_code }, Some(uid)) => self
                .lobby
                .start_game(uid, &room_code)
                .await
                .map(|()| Response::Ack(Ack::ok("Game starting. Proceed to loadout selection.")))
                .map_err(room_failure),
            (
                Operation::SelectLoadout {
                    room_code,
                    attack_tools,
                    defense_tools,
                },
                Some(uid),
            ) => self
                .lobby
                .select_loadout(uid, &room_code, &attack_tools, &defense_tools)
                .await
                .map(|outcome| Response::Ack(Ack::ok(outcome.message())))
                .map_err(room_failure),
        };

        if let Err(e) = &result {
            debug!(op = name, uid = ?caller.map(Uid::as_str), code = %e.code, "call failed");
        }
        result
    }
}

/// Every purchasable tier, cheapest first.
fn catalog() -> Response {
    let items = StatusTier::ALL
        .into_iter()
        .map(|tier| CatalogEntry {
            item_id: tier.slug().to_string(),
            name: tier.display_name().to_string(),
            cost_sats: tier.cost().as_sats(),
            prestige_delta: tier.prestige_delta(),
        })
        .collect();
    Response::Catalog { items }
}

fn room_failure(err: RoomError) -> CallError {
    let code = err.code();
    if code == ErrorCode::Internal {
        warn!(error = %err, "room operation failed internally");
    }
    CallError::new(code, err.to_string())
}

fn economy_failure(err: EconomyError) -> CallError {
    let code = err.code();
    if code == ErrorCode::Internal {
        warn!(error = %err, "purchase failed internally");
    }
    CallError::new(code, err.to_string())
}
