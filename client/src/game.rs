//! Local world replica shared between the network reader and the
//! presentation loop.

use log::warn;
use shared::{Avatar, Event, World};
use std::cmp::Ordering;
use std::sync::{Arc, Mutex, PoisonError};

/// Client-side copy of the world. Cheap to clone; all clones share the same
/// underlying state.
#[derive(Clone, Default)]
pub struct Replica {
    inner: Arc<Mutex<ReplicaState>>,
}

#[derive(Default)]
struct ReplicaState {
    world: World,
    connected: bool,
}

impl Replica {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one inbound event to the replica. Apply failures are logged
    /// and the event discarded; in practice only snapshots arrive here.
    pub fn apply(&self, event: &Event) {
        let mut state = self.lock();
        if let Err(err) = state.world.apply(event) {
            warn!("Discarding inbound event: {}", err);
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    /// Whether the session is still delivering snapshots. The presentation
    /// layer surfaces a disconnect state when this goes false.
    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// Avatars sorted by ascending Y for back-to-front draw layering.
    pub fn render_avatars(&self) -> Vec<Avatar> {
        let state = self.lock();
        let mut avatars: Vec<Avatar> = state.world.avatars.values().cloned().collect();
        avatars.sort_by(|a, b| a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal));
        avatars
    }

    pub fn avatar_count(&self) -> usize {
        self.lock().world.avatars.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ReplicaState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
