//! Per-connection session lifecycle for the synchronization protocol
//!
//! Each WebSocket connection is driven by one [`Session`] moving through
//! `Connecting -> Handshaking -> Streaming -> Closed`. The transition rules
//! live here as synchronous methods over the shared [`World`], so the whole
//! protocol is unit-testable without sockets:
//!
//! - The first inbound message must be a valid `init` event. Anything else
//!   is a protocol violation and the connection is closed rather than
//!   guessing intent.
//! - While streaming, only `move`/`idle` events are meaningful. Decode and
//!   apply failures are logged and the message discarded; a client cannot
//!   take down the shared world with one bad message.
//! - Closing removes the session's avatar from the world so snapshots never
//!   accumulate stale entries.

use log::{info, warn};
use shared::{Event, World};
use thiserror::Error;

/// Connection lifecycle states. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Handshaking,
    Streaming,
    Closed,
}

/// Failures that are fatal to one session (and only that session).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("snapshot delivery stalled")]
    Delivery,
}

/// State machine for one client connection.
pub struct Session {
    state: SessionState,
    avatar_id: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Connecting,
            avatar_id: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Identity of the avatar this session introduced, once handshaken.
    pub fn avatar_id(&self) -> Option<&str> {
        self.avatar_id.as_deref()
    }

    /// Marks the transport upgrade as complete; the next inbound message is
    /// expected to be the handshake.
    pub fn on_upgraded(&mut self) {
        if self.state == SessionState::Connecting {
            self.state = SessionState::Handshaking;
        }
    }

    /// Handles one inbound text message according to the current state.
    ///
    /// An `Err` return means the session is now `Closed` and the caller must
    /// tear down the connection; the session's avatar has not been removed
    /// yet (that happens in [`Session::close`]).
    pub fn on_message(&mut self, world: &mut World, text: &str) -> Result<(), SessionError> {
        match self.state {
            SessionState::Handshaking => self.handshake(world, text),
            SessionState::Streaming => {
                self.streaming(world, text);
                Ok(())
            }
            SessionState::Connecting | SessionState::Closed => {
                self.state = SessionState::Closed;
                Err(SessionError::Protocol(
                    "message outside of an open session".to_string(),
                ))
            }
        }
    }

    fn handshake(&mut self, world: &mut World, text: &str) -> Result<(), SessionError> {
        let event = match Event::decode(text) {
            Ok(event) => event,
            Err(err) => {
                self.state = SessionState::Closed;
                return Err(SessionError::Protocol(format!(
                    "handshake failed to decode: {err}"
                )));
            }
        };

        match event {
            Event::Init { ref id, .. } => {
                if let Err(err) = world.apply(&event) {
                    self.state = SessionState::Closed;
                    return Err(SessionError::Protocol(format!(
                        "handshake rejected: {err}"
                    )));
                }
                info!("Avatar {} joined", id);
                self.avatar_id = Some(id.clone());
                self.state = SessionState::Streaming;
                Ok(())
            }
            other => {
                self.state = SessionState::Closed;
                Err(SessionError::Protocol(format!(
                    "first message must be init, got {}",
                    event_kind(&other)
                )))
            }
        }
    }

    fn streaming(&mut self, world: &mut World, text: &str) {
        match Event::decode(text) {
            Ok(event @ (Event::Move { .. } | Event::Idle { .. })) => {
                if let Err(err) = world.apply(&event) {
                    warn!(
                        "Discarding event from session {:?}: {}",
                        self.avatar_id, err
                    );
                }
            }
            Ok(other) => {
                warn!(
                    "Discarding out-of-place {} event from session {:?}",
                    event_kind(&other),
                    self.avatar_id
                );
            }
            Err(err) => {
                warn!(
                    "Discarding undecodable message from session {:?}: {}",
                    self.avatar_id, err
                );
            }
        }
    }

    /// Terminal transition. Removes the session's avatar from the world so
    /// later snapshots no longer carry it. Safe to call more than once.
    pub fn close(&mut self, world: &mut World) {
        self.state = SessionState::Closed;
        if let Some(id) = self.avatar_id.take() {
            if world.remove(&id).is_some() {
                info!("Avatar {} left", id);
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn event_kind(event: &Event) -> &'static str {
    match event {
        Event::Init { .. } => "init",
        Event::Move { .. } => "move",
        Event::Idle { .. } => "idle",
        Event::Snapshot { .. } => "snapshot",
    }
}
