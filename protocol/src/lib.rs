//! Shared wire model for the collaborative canvas protocol.
//!
//! This crate owns the message types exchanged between `server` and
//! `client`: the drawing [`Operation`] data model and the closed
//! [`ClientMessage`] / [`ServerMessage`] event enums. Every WebSocket text
//! message is exactly one JSON object carrying a `type` tag, so dispatch on
//! either side is an exhaustive `match` rather than string routing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error returned by the decode/encode functions.
#[derive(Debug, thiserror::Error)]
#[error("malformed protocol message: {0}")]
pub struct CodecError(#[from] serde_json::Error);

// =============================================================================
// DRAWING MODEL
// =============================================================================

/// A single captured input point. `t` is the client-side capture timestamp
/// in milliseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub t: i64,
}

/// How an operation composites onto the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    /// Additive paint in `color`.
    Stroke,
    /// Destructive erase; `color` is ignored by renderers.
    Erase,
}

/// One drawing operation in a room's log.
///
/// Immutable once created, except for `undone`, which only undo/redo flip.
/// `points` is ordered and expected non-empty; the order defines the path
/// geometry and is never reordered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Globally unique, assigned by the submitting client at creation.
    pub id: Uuid,
    /// Opaque identifier of the submitting participant.
    pub author_id: String,
    pub kind: OpKind,
    pub color: String,
    pub stroke_width: f64,
    pub points: Vec<Point>,
    /// Submission timestamp, milliseconds since the Unix epoch.
    pub created_at: i64,
    pub undone: bool,
}

/// A connected room member as presented in `USER_LIST`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Server-assigned identity, fresh per connection.
    pub participant_id: Uuid,
    pub name: String,
    /// Server-assigned presence color used for remote cursors.
    pub color: String,
}

// =============================================================================
// EVENTS
// =============================================================================

/// Everything a client may send to the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Join (and lazily create) a room. Valid once per connection.
    JoinRoom { room_id: String, name: String },
    /// Submit a finished drawing operation for appending to the room log.
    Operation(Operation),
    /// Undo the most recent not-yet-undone operation, whoever drew it.
    Undo,
    /// Restore the most recently undone operation.
    Redo,
    /// Ephemeral cursor position; relayed to the rest of the room.
    CursorMove { x: f64, y: f64 },
}

/// Everything the server may send to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Full log bootstrap, sent to a joiner only. Undone entries are
    /// included and tagged so the receiver can reconstruct exact state.
    SyncState { ops: Vec<Operation> },
    /// Current membership of the room, broadcast on every join and leave.
    UserList { users: Vec<Participant> },
    /// An operation confirmed and positioned by the server. Broadcast to
    /// the whole room, the submitting client included.
    Operation(Operation),
    /// The named operation was marked undone.
    Undo(Operation),
    /// The named operation was restored.
    Redo(Operation),
    /// A peer's cursor moved. Never echoed to its originator.
    CursorMove { participant_id: Uuid, x: f64, y: f64 },
}

// =============================================================================
// CODEC
// =============================================================================

/// Decode one client-to-server message from a WebSocket text payload.
///
/// # Errors
///
/// Returns [`CodecError`] for anything that is not exactly one well-formed
/// tagged message object.
pub fn decode_client(text: &str) -> Result<ClientMessage, CodecError> {
    Ok(serde_json::from_str(text)?)
}

/// Decode one server-to-client message from a WebSocket text payload.
///
/// # Errors
///
/// Returns [`CodecError`] for anything that is not exactly one well-formed
/// tagged message object.
pub fn decode_server(text: &str) -> Result<ServerMessage, CodecError> {
    Ok(serde_json::from_str(text)?)
}

/// Encode a client-to-server message as a WebSocket text payload.
///
/// # Errors
///
/// Returns [`CodecError`] if serialization fails; this does not happen for
/// values constructed through this crate's types.
pub fn encode_client(msg: &ClientMessage) -> Result<String, CodecError> {
    Ok(serde_json::to_string(msg)?)
}

/// Encode a server-to-client message as a WebSocket text payload.
///
/// # Errors
///
/// Returns [`CodecError`] if serialization fails; this does not happen for
/// values constructed through this crate's types.
pub fn encode_server(msg: &ServerMessage) -> Result<String, CodecError> {
    Ok(serde_json::to_string(msg)?)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
