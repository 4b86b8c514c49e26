//! Room registry — lazily-created rooms, membership, and fan-out.
//!
//! DESIGN
//! ======
//! Rooms come into existence on first join and stay resident for the life
//! of the process; an empty room is cheap (an empty log and two empty maps)
//! and re-entry must see the same drawing history. All membership and log
//! mutation happens while the caller holds the room's mutex, so the
//! functions here take `&Room` / `&mut Room` rather than locking
//! themselves.
//!
//! Broadcast is fire-and-forget: events are `try_send`-ed onto each
//! connection's channel and a full channel loses the frame for that client
//! rather than stalling the room.

use protocol::{Participant, ServerMessage};
use rand::Rng;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::state::{AppState, Room, RoomHandle};

/// Presence colors assigned to joiners, round-robin by chance.
const PRESENCE_PALETTE: [&str; 8] = [
    "#ef4444", "#f97316", "#eab308", "#22c55e", "#14b8a6", "#3b82f6", "#8b5cf6", "#ec4899",
];

// =============================================================================
// REGISTRY
// =============================================================================

/// Fetch a room, creating it if this is the first time the id is seen.
/// Idempotent and infallible.
pub async fn get_or_create(state: &AppState, room_id: &str) -> RoomHandle {
    let mut rooms = state.rooms.write().await;
    if let Some(existing) = rooms.get(room_id) {
        return RoomHandle::clone(existing);
    }

    info!(%room_id, "created room");
    let handle = RoomHandle::default();
    rooms.insert(room_id.to_owned(), RoomHandle::clone(&handle));
    handle
}

/// Fetch a room without creating one as a side effect.
pub async fn get(state: &AppState, room_id: &str) -> Option<RoomHandle> {
    state.rooms.read().await.get(room_id).map(RoomHandle::clone)
}

// =============================================================================
// MEMBERSHIP
// =============================================================================

/// Register a connection in a room's participant and client maps.
pub fn join(room: &mut Room, conn_id: Uuid, tx: mpsc::Sender<ServerMessage>, participant: Participant) {
    room.clients.insert(conn_id, tx);
    room.participants.insert(conn_id, participant);
    info!(%conn_id, members = room.participants.len(), "client joined room");
}

/// Remove a connection from a room. The operation log is never touched by
/// membership changes.
pub fn leave(room: &mut Room, conn_id: Uuid) {
    room.clients.remove(&conn_id);
    room.participants.remove(&conn_id);
    info!(%conn_id, remaining = room.participants.len(), "client left room");
}

/// Current membership for a `USER_LIST` broadcast.
#[must_use]
pub fn user_list(room: &Room) -> Vec<Participant> {
    room.participants.values().cloned().collect()
}

/// Pick a presence color for a new participant.
#[must_use]
pub fn presence_color() -> &'static str {
    let idx = rand::rng().random_range(0..PRESENCE_PALETTE.len());
    PRESENCE_PALETTE[idx]
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Send an event to every client in the room, optionally excluding one
/// connection. Best-effort: a client whose channel is full is skipped.
pub fn broadcast(room: &Room, msg: &ServerMessage, exclude: Option<Uuid>) {
    for (conn_id, tx) in &room.clients {
        if exclude == Some(*conn_id) {
            continue;
        }
        let _ = tx.try_send(msg.clone());
    }
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
