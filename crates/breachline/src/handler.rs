//! Per-connection handler: handshake, call routing, room feeds.
//!
//! Each accepted connection gets its own Tokio task running this handler:
//!   1. Receive `Handshake` → check version → resolve the optional token
//!   2. Send `HandshakeAck` (with the uid, or none for anonymous clients)
//!   3. Loop: receive envelopes → answer calls, heartbeats, subscriptions
//!
//! Room feeds run as extra tasks that share the connection's [`Outbox`];
//! they are aborted when the client unsubscribes or the handler exits.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use breachline_protocol::{
    ClientMessage, Codec, Envelope, ErrorCode, ProtocolError, RoomCode, ServerMessage, Uid,
};
use breachline_room::room_key;
use breachline_session::Authenticator;
use breachline_store::{Snapshot, Store};
use breachline_transport::{Connection, WebSocketConnection};
use tokio::sync::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::GatewayError;
use crate::server::{PROTOCOL_VERSION, ServerState};

/// Room feeds one connection may hold at once.
const MAX_SUBSCRIPTIONS: usize = 8;

/// The sending half of a connection, shared with its room feeds.
///
/// The sequence counter is held across the write, so frames from the
/// handler and from feed tasks reach the wire in `seq` order.
struct Outbox<C: Codec> {
    conn: WebSocketConnection,
    codec: C,
    seq: Mutex<u64>,
    start: Instant,
}

impl<C: Codec> Outbox<C> {
    fn new(conn: WebSocketConnection, codec: C) -> Self {
        Self {
            conn,
            codec,
            seq: Mutex::new(0),
            start: Instant::now(),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    async fn send(&self, message: ServerMessage) -> Result<(), GatewayError> {
        let mut seq = self.seq.lock().await;
        let envelope = Envelope {
            seq: *seq,
            timestamp: self.elapsed_ms(),
            message,
        };
        let bytes = self.codec.encode(&envelope)?;
        self.conn.send(&bytes).await?;
        *seq += 1;
        Ok(())
    }

    async fn send_error(&self, code: ErrorCode, message: impl Into<String>) -> Result<(), GatewayError> {
        self.send(ServerMessage::Error {
            code,
            message: message.into(),
        })
        .await
    }
}

/// Live room feeds of one connection. Dropping it stops them all.
#[derive(Default)]
struct Subscriptions {
    feeds: HashMap<RoomCode, JoinHandle<()>>,
}

impl Subscriptions {
    fn contains(&self, code: &RoomCode) -> bool {
        self.feeds
            .get(code)
            .is_some_and(|feed| !feed.is_finished())
    }

    fn is_full(&self) -> bool {
        self.feeds.values().filter(|feed| !feed.is_finished()).count() >= MAX_SUBSCRIPTIONS
    }

    fn insert(&mut self, code: RoomCode, feed: JoinHandle<()>) {
        if let Some(old) = self.feeds.insert(code, feed) {
            old.abort();
        }
    }

    fn cancel(&mut self, code: &RoomCode) -> bool {
        match self.feeds.remove(code) {
            Some(feed) => {
                feed.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        for (_, feed) in self.feeds.drain() {
            feed.abort();
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, A, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, A, C>>,
) -> Result<(), GatewayError>
where
    S: Store,
    A: Authenticator,
    C: Codec + Clone,
{
    let conn_id = conn.id();
    debug!(%conn_id, "handling new connection");

    let outbox = Arc::new(Outbox::new(conn, state.codec.clone()));
    let uid = perform_handshake(&outbox, &state).await?;
    match &uid {
        Some(uid) => info!(%conn_id, %uid, "client authenticated"),
        None => info!(%conn_id, "anonymous client connected"),
    }

    let mut subscriptions = Subscriptions::default();

    loop {
        let data = match tokio::time::timeout(state.config.idle_timeout, outbox.conn.recv()).await
        {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                info!(%conn_id, "connection idle, closing");
                break;
            }
        };

        let envelope: Envelope<ClientMessage> = match state.codec.decode(&data) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(%conn_id, error = %e, "failed to decode envelope");
                outbox
                    .send_error(ErrorCode::InvalidArgument, format!("malformed frame: {e}"))
                    .await?;
                continue;
            }
        };

        let should_close = handle_message(
            &outbox,
            &state,
            uid.as_ref(),
            envelope.message,
            &mut subscriptions,
        )
        .await?;
        if should_close {
            break;
        }
    }

    drop(subscriptions);
    if let Err(e) = outbox.conn.close().await {
        debug!(%conn_id, error = %e, "close failed");
    }
    Ok(())
}

/// Receives the `Handshake`, validates it, and acknowledges it.
///
/// Returns the caller's uid, or `None` when no token was presented.
async fn perform_handshake<S, A, C>(
    outbox: &Outbox<C>,
    state: &ServerState<S, A, C>,
) -> Result<Option<Uid>, GatewayError>
where
    S: Store,
    A: Authenticator,
    C: Codec,
{
    let data = match tokio::time::timeout(state.config.handshake_timeout, outbox.conn.recv()).await
    {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage("connection closed before handshake".into()).into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let envelope: Envelope<ClientMessage> = match state.codec.decode(&data) {
        Ok(envelope) => envelope,
        Err(e) => {
            outbox
                .send_error(ErrorCode::InvalidArgument, "expected Handshake")
                .await?;
            return Err(e.into());
        }
    };

    let (version, token) = match envelope.message {
        ClientMessage::Handshake { version, token } => (version, token),
        _ => {
            outbox
                .send_error(ErrorCode::InvalidArgument, "expected Handshake")
                .await?;
            return Err(
                ProtocolError::InvalidMessage("first message must be Handshake".into()).into(),
            );
        }
    };

    if version != PROTOCOL_VERSION {
        outbox
            .send_error(
                ErrorCode::InvalidArgument,
                format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
            )
            .await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    let uid = match token.as_deref().filter(|t| !t.is_empty()) {
        None => None,
        Some(token) => match state.auth.authenticate(token).await {
            Ok(uid) => Some(uid),
            Err(e) => {
                outbox
                    .send_error(ErrorCode::Unauthenticated, "invalid credentials")
                    .await?;
                if let Err(close_err) = outbox.conn.close().await {
                    debug!(error = %close_err, "close after failed auth failed");
                }
                return Err(e.into());
            }
        },
    };

    outbox
        .send(ServerMessage::HandshakeAck {
            uid: uid.clone(),
            server_time: outbox.elapsed_ms(),
        })
        .await?;
    Ok(uid)
}

/// Handles one client frame. Returns `true` if the connection should close.
async fn handle_message<S, A, C>(
    outbox: &Arc<Outbox<C>>,
    state: &ServerState<S, A, C>,
    uid: Option<&Uid>,
    message: ClientMessage,
    subscriptions: &mut Subscriptions,
) -> Result<bool, GatewayError>
where
    S: Store,
    A: Authenticator,
    C: Codec,
{
    match message {
        ClientMessage::Call { id, call } => {
            let outcome = state.gateway.call(uid, call).await;
            outbox
                .send(ServerMessage::Reply {
                    id,
                    outcome: outcome.into(),
                })
                .await?;
        }

        ClientMessage::Subscribe { room_code } => {
            subscribe(outbox, state, uid, &room_code, subscriptions).await?;
        }

        ClientMessage::Unsubscribe { room_code } => match RoomCode::parse(&room_code) {
            Ok(code) => {
                if subscriptions.cancel(&code) {
                    debug!(room_code = %code, "room feed cancelled");
                }
            }
            Err(e) => {
                outbox
                    .send_error(ErrorCode::InvalidArgument, e.to_string())
                    .await?;
            }
        },

        ClientMessage::Heartbeat { client_time } => {
            outbox
                .send(ServerMessage::HeartbeatAck {
                    client_time,
                    server_time: outbox.elapsed_ms(),
                })
                .await?;
        }

        ClientMessage::Disconnect { reason } => {
            info!(uid = ?uid.map(Uid::as_str), %reason, "client disconnected");
            return Ok(true);
        }

        ClientMessage::Handshake { .. } => {
            outbox
                .send_error(ErrorCode::InvalidArgument, "handshake already completed")
                .await?;
        }
    }

    Ok(false)
}

/// Sends the current room and starts a feed of its later changes.
async fn subscribe<S, A, C>(
    outbox: &Arc<Outbox<C>>,
    state: &ServerState<S, A, C>,
    uid: Option<&Uid>,
    room_code: &str,
    subscriptions: &mut Subscriptions,
) -> Result<(), GatewayError>
where
    S: Store,
    A: Authenticator,
    C: Codec,
{
    if uid.is_none() {
        return outbox
            .send_error(
                ErrorCode::Unauthenticated,
                "You must be signed in to watch a room.",
            )
            .await;
    }
    let code = match RoomCode::parse(room_code) {
        Ok(code) => code,
        Err(e) => {
            return outbox
                .send_error(ErrorCode::InvalidArgument, e.to_string())
                .await;
        }
    };
    if subscriptions.contains(&code) {
        return Ok(());
    }
    if subscriptions.is_full() {
        return outbox
            .send_error(
                ErrorCode::FailedPrecondition,
                format!("at most {MAX_SUBSCRIPTIONS} rooms can be watched at once"),
            )
            .await;
    }

    // Subscribe before reading so no commit falls between the two.
    let key = room_key(&code);
    let changes = state.store.subscribe(&key);
    let current = match state.store.get(&key).await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => {
            drop(changes);
            return outbox
                .send_error(ErrorCode::NotFound, format!("room {code} not found"))
                .await;
        }
        Err(e) => {
            warn!(room_code = %code, error = %e, "reading room for subscription failed");
            return outbox
                .send_error(ErrorCode::Internal, "could not read room")
                .await;
        }
    };

    let version = current.version;
    outbox
        .send(ServerMessage::RoomSnapshot {
            room_code: code.clone(),
            room: current.data,
        })
        .await?;

    let feed = tokio::spawn(forward_room_changes(
        Arc::clone(outbox),
        Arc::clone(&state.store),
        code.clone(),
        changes,
        version,
    ));
    debug!(room_code = %code, "room feed started");
    subscriptions.insert(code, feed);
    Ok(())
}

/// Pushes every committed change of a room newer than `last_version`.
async fn forward_room_changes<S, C>(
    outbox: Arc<Outbox<C>>,
    store: Arc<S>,
    code: RoomCode,
    mut changes: broadcast::Receiver<Snapshot>,
    mut last_version: u64,
) where
    S: Store,
    C: Codec,
{
    loop {
        let snapshot = match changes.recv().await {
            Ok(snapshot) => snapshot,
            Err(RecvError::Lagged(skipped)) => {
                debug!(room_code = %code, skipped, "room feed lagged, re-reading");
                match store.get(&room_key(&code)).await {
                    Ok(Some(snapshot)) => snapshot,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(room_code = %code, error = %e, "re-reading room failed");
                        return;
                    }
                }
            }
            Err(RecvError::Closed) => return,
        };

        if snapshot.version <= last_version {
            continue;
        }
        last_version = snapshot.version;

        let pushed = outbox
            .send(ServerMessage::RoomSnapshot {
                room_code: code.clone(),
                room: snapshot.data,
            })
            .await;
        if let Err(e) = pushed {
            debug!(room_code = %code, error = %e, "room feed stopped");
            return;
        }
    }
}
