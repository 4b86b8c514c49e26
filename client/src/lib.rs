//! Client-side mirror of a room's operation log.
//!
//! The library half of this crate is transport-agnostic: it consumes
//! decoded [`protocol::ServerMessage`] values and keeps a local replica in
//! agreement with the server's record. The binary half is a terminal client
//! over `tokio-tungstenite`.

pub mod reconciler;
