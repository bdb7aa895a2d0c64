//! Fixed-rate snapshot broadcasting to every streaming session
//!
//! The scheduler runs independently of any connection's read path. Each tick
//! it read-locks the world, encodes one snapshot event, and `try_send`s it to
//! every registered session's outbound queue. Queues are small and bounded:
//! a session that cannot keep up loses snapshots (last-snapshot-wins) instead
//! of delaying delivery to everyone else, and a closed queue unregisters the
//! session. The loop itself never terminates on a session failure.

use log::{debug, error};
use shared::World;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;

/// Outbound queue depth per session. A session this far behind starts
/// losing snapshots.
pub const OUTBOUND_QUEUE: usize = 4;

/// Shared handles to the authoritative world and the session registry.
pub type SharedWorld = Arc<RwLock<World>>;
pub type SharedRegistry = Arc<RwLock<Registry>>;

/// Registry of sessions currently participating in the broadcast, keyed by
/// a server-assigned session id. Sessions register when they enter the
/// streaming state and unregister on close.
#[derive(Default)]
pub struct Registry {
    sessions: HashMap<u64, mpsc::Sender<Message>>,
    next_id: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session's outbound queue and returns its registration id.
    pub fn register(&mut self, sender: mpsc::Sender<Message>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.sessions.insert(id, sender);
        id
    }

    /// Drops a session's registration. Returns false if it was already gone.
    pub fn unregister(&mut self, id: u64) -> bool {
        self.sessions.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn senders(&self) -> Vec<(u64, mpsc::Sender<Message>)> {
        self.sessions
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect()
    }
}

/// Runs the broadcast scheduler forever at `tick_rate` ticks per second.
/// A zero rate has no meaningful interval and is floored to 1 Hz.
pub async fn run(world: SharedWorld, registry: SharedRegistry, tick_rate: u32) {
    let tick_rate = tick_rate.max(1);
    let mut ticker = interval(Duration::from_secs_f64(1.0 / tick_rate as f64));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let targets = {
            let registry = registry.read().await;
            if registry.is_empty() {
                continue;
            }
            registry.senders()
        };

        // One encode per tick, shared by every session.
        let snapshot = {
            let world = world.read().await;
            world.snapshot_event()
        };
        let text = match snapshot.encode() {
            Ok(text) => text,
            Err(err) => {
                error!("Failed to encode snapshot: {}", err);
                continue;
            }
        };

        let mut stale = Vec::new();
        for (id, sender) in targets {
            match sender.try_send(Message::Text(text.clone())) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    // Slow consumer; it gets a fresher snapshot next tick.
                    debug!("Session {} lagging, snapshot dropped", id);
                }
                Err(TrySendError::Closed(_)) => stale.push(id),
            }
        }

        if !stale.is_empty() {
            let mut registry = registry.write().await;
            for id in stale {
                registry.unregister(id);
            }
        }
    }
}
