//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the room registry: a map from room id to an independently-lockable
//! `Room`. The registry lock is held only long enough to fetch or insert a
//! room handle; a room's own mutex is held for the duration of one inbound
//! event, which serializes all mutation of that room's log and participant
//! map without coupling rooms to one another.

use std::collections::HashMap;
use std::sync::Arc;

use protocol::{Participant, ServerMessage};
use tokio::sync::{Mutex, RwLock, mpsc};
use uuid::Uuid;

use crate::oplog::OperationLog;

/// Shared handle to one room's serialized state.
pub type RoomHandle = Arc<Mutex<Room>>;

// =============================================================================
// ROOM
// =============================================================================

/// Per-room live state: the authoritative operation log plus everyone
/// currently connected. Keyed maps use the connection id, not the
/// participant id, so a disconnect can be cleaned up without a lookup.
pub struct Room {
    /// Authoritative ordered record of drawing operations.
    pub log: OperationLog,
    /// Connected members: connection id -> presence identity.
    pub participants: HashMap<Uuid, Participant>,
    /// Connected members: connection id -> sender for outbound events.
    pub clients: HashMap<Uuid, mpsc::Sender<ServerMessage>>,
}

impl Room {
    #[must_use]
    pub fn new() -> Self {
        Self {
            log: OperationLog::new(),
            participants: HashMap::new(),
            clients: HashMap::new(),
        }
    }
}

impl Default for Room {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state. Clone is required by Axum; the registry is
/// Arc-wrapped so clones observe the same rooms.
#[derive(Clone)]
pub struct AppState {
    /// Active rooms keyed by room id. Rooms are created lazily on first
    /// join and stay resident for the life of the process.
    pub rooms: Arc<RwLock<HashMap<String, RoomHandle>>>,
}

impl AppState {
    #[must_use]
    pub fn new() -> Self {
        Self { rooms: Arc::new(RwLock::new(HashMap::new())) }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
