//! # World Synchronization Server
//!
//! Authoritative server for a small shared world of player avatars. Clients
//! connect over a WebSocket upgrade, introduce an avatar with an `init`
//! event, and stream `move`/`idle` intent; the server applies every event to
//! its single authoritative [`shared::World`] and pushes full snapshots back
//! to all streaming sessions at a fixed rate.
//!
//! ## Module organization
//!
//! - [`session`]: the per-connection protocol state machine
//!   (`Connecting -> Handshaking -> Streaming -> Closed`) and its error
//!   containment rules.
//! - [`broadcast`]: the session registry and the fixed-rate snapshot
//!   scheduler.
//! - [`network`]: TCP listen, WebSocket upgrade, and the per-connection
//!   reader/writer task pair.
//!
//! ## Concurrency discipline
//!
//! The world lives behind one `Arc<RwLock<World>>`. Connection tasks are the
//! only writers (they apply decoded events); the broadcast scheduler only
//! reads. Per-session outbound queues are bounded and fed with `try_send`,
//! so one slow client drops its own snapshots instead of stalling the tick,
//! and a send timeout closes only the offending connection.

pub mod broadcast;
pub mod network;
pub mod session;
