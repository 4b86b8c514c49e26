//! WebSocket handler — the per-connection session coordinator.
//!
//! DESIGN
//! ======
//! On upgrade, each connection gets a fresh connection id and an outbound
//! channel, then enters a `select!` loop:
//! - Incoming client text frames → decode + dispatch by message variant
//! - Events broadcast by room peers → forward to the socket
//!
//! Dispatch is a state machine over [`Session`]: a connection starts
//! `Unjoined`, becomes `Joined` on its first `JOIN_ROOM`, and stays joined
//! until the socket closes; there is no room switching. Events that need a
//! joined session and arrive before one are dropped. A room's mutex is held
//! for the whole handling of one event, so log appends and undo/redo
//! toggles are serialized per room and broadcasts always reflect the state
//! they were computed from.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → `Unjoined`
//! 2. `JOIN_ROOM` → register in room, reply `SYNC_STATE`, broadcast `USER_LIST`
//! 3. Drawing traffic → append/toggle + fan-out
//! 4. Close → deregister, broadcast updated `USER_LIST`

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use protocol::{ClientMessage, Operation, Participant, ServerMessage, decode_client, encode_server};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::services::room;
use crate::state::AppState;

/// Protocol position of one connection. `Joined` is terminal until
/// disconnect; a client reconnects to change rooms.
enum Session {
    Unjoined,
    Joined { room_id: String, participant: Participant },
}

// =============================================================================
// CONNECTION
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();

    // Per-connection channel through which room broadcasts arrive.
    let (client_tx, mut client_rx) = mpsc::channel::<ServerMessage>(256);
    let mut session = Session::Unjoined;

    info!(%conn_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let replies =
                            process_client_message(&state, &mut session, conn_id, &client_tx, &text).await;
                        for reply in replies {
                            let _ = send_message(&mut socket, &reply).await;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(msg) = client_rx.recv() => {
                if send_message(&mut socket, &msg).await.is_err() {
                    break;
                }
            }
        }
    }

    disconnect(&state, &session, conn_id).await;
    info!(%conn_id, "ws: client disconnected");
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Decode and handle one inbound text frame, returning the frames owed
/// directly to the sender. Broadcasts (which may include the sender, via
/// its registered channel) happen inside.
///
/// Kept free of socket types so tests can drive the state machine with
/// plain channels.
async fn process_client_message(
    state: &AppState,
    session: &mut Session,
    conn_id: Uuid,
    client_tx: &mpsc::Sender<ServerMessage>,
    text: &str,
) -> Vec<ServerMessage> {
    let msg = match decode_client(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(%conn_id, error = %e, "ws: undecodable frame dropped");
            return Vec::new();
        }
    };

    match msg {
        ClientMessage::JoinRoom { room_id, name } => {
            join_room(state, session, conn_id, client_tx, room_id, name).await
        }
        ClientMessage::Operation(op) => {
            submit_operation(state, session, conn_id, op).await;
            Vec::new()
        }
        ClientMessage::Undo => {
            toggle_history(state, session, conn_id, History::Undo).await;
            Vec::new()
        }
        ClientMessage::Redo => {
            toggle_history(state, session, conn_id, History::Redo).await;
            Vec::new()
        }
        ClientMessage::CursorMove { x, y } => {
            relay_cursor(state, session, conn_id, x, y).await;
            Vec::new()
        }
    }
}

// =============================================================================
// EVENT HANDLERS
// =============================================================================

async fn join_room(
    state: &AppState,
    session: &mut Session,
    conn_id: Uuid,
    client_tx: &mpsc::Sender<ServerMessage>,
    room_id: String,
    name: String,
) -> Vec<ServerMessage> {
    if let Session::Joined { room_id: current, .. } = session {
        debug!(%conn_id, %current, "ws: JOIN_ROOM from an already-joined session dropped");
        return Vec::new();
    }

    let participant = Participant {
        participant_id: Uuid::new_v4(),
        name,
        color: room::presence_color().to_owned(),
    };

    let handle = room::get_or_create(state, &room_id).await;
    let snapshot = {
        let mut locked = handle.lock().await;
        room::join(&mut locked, conn_id, client_tx.clone(), participant.clone());
        let users = room::user_list(&locked);
        room::broadcast(&locked, &ServerMessage::UserList { users }, None);
        locked.log.snapshot()
    };

    info!(%conn_id, %room_id, name = %participant.name, ops = snapshot.len(), "ws: joined room");
    *session = Session::Joined { room_id, participant };

    vec![ServerMessage::SyncState { ops: snapshot }]
}

async fn submit_operation(state: &AppState, session: &Session, conn_id: Uuid, op: Operation) {
    let Session::Joined { room_id, .. } = session else {
        debug!(%conn_id, "ws: OPERATION before JOIN_ROOM dropped");
        return;
    };
    let Some(handle) = room::get(state, room_id).await else {
        return;
    };

    let mut locked = handle.lock().await;
    locked.log.append(op.clone());
    debug!(%room_id, op_id = %op.id, position = locked.log.len(), "ws: operation appended");

    // The sender receives its own operation back; its local preview is
    // reconciled against this authoritative copy, not trusted as final.
    room::broadcast(&locked, &ServerMessage::Operation(op), None);
}

enum History {
    Undo,
    Redo,
}

async fn toggle_history(state: &AppState, session: &Session, conn_id: Uuid, direction: History) {
    let Session::Joined { room_id, .. } = session else {
        debug!(%conn_id, "ws: undo/redo before JOIN_ROOM dropped");
        return;
    };
    let Some(handle) = room::get(state, room_id).await else {
        return;
    };

    let mut locked = handle.lock().await;
    let event = match direction {
        History::Undo => locked.log.undo().map(ServerMessage::Undo),
        History::Redo => locked.log.redo().map(ServerMessage::Redo),
    };

    // Nothing eligible is a silent no-op, observably identical to success
    // with no effect: no broadcast goes out.
    let Some(event) = event else {
        debug!(%room_id, "ws: undo/redo with nothing eligible");
        return;
    };
    room::broadcast(&locked, &event, None);
}

async fn relay_cursor(state: &AppState, session: &Session, conn_id: Uuid, x: f64, y: f64) {
    let Session::Joined { room_id, participant } = session else {
        debug!(%conn_id, "ws: CURSOR_MOVE before JOIN_ROOM dropped");
        return;
    };
    let Some(handle) = room::get(state, room_id).await else {
        return;
    };

    let locked = handle.lock().await;
    let event = ServerMessage::CursorMove {
        participant_id: participant.participant_id,
        x,
        y,
    };
    room::broadcast(&locked, &event, Some(conn_id));
}

async fn disconnect(state: &AppState, session: &Session, conn_id: Uuid) {
    let Session::Joined { room_id, .. } = session else {
        return;
    };
    let Some(handle) = room::get(state, room_id).await else {
        return;
    };

    let mut locked = handle.lock().await;
    room::leave(&mut locked, conn_id);
    let users = room::user_list(&locked);
    room::broadcast(&locked, &ServerMessage::UserList { users }, None);
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), ()> {
    let text = match encode_server(msg) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "ws: failed to encode outbound message");
            return Err(());
        }
    };
    socket.send(Message::Text(text.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
