//! # World Synchronization Client
//!
//! Thin reflector client: it holds a local read-only replica of the server's
//! world, applies every inbound snapshot to it, and forwards local input as
//! `move`/`idle` events. There is no prediction, reconciliation, or
//! interpolation; the replica always shows the last authoritative snapshot.
//!
//! ## Module organization
//!
//! - [`game`]: the local world replica and its render view.
//! - [`input`]: held-key sampling and the per-tick translation into events.
//! - [`network`]: WebSocket connection, handshake, and the two pump loops.
//! - [`rendering`]: macroquad presentation of the replica.
//!
//! The replica is shared between the WebSocket reader task (writer) and the
//! presentation loop (reader) behind a single mutex; those are the only two
//! activities in the process.

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
