//! Input polling and per-tick translation into move/idle events

use macroquad::prelude::*;
use shared::{Direction, Event};

/// Movement keys held during one polling tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldKeys {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl HeldKeys {
    /// Samples the movement keys (WASD and arrows).
    pub fn sample() -> Self {
        Self {
            up: is_key_down(KeyCode::W) || is_key_down(KeyCode::Up),
            down: is_key_down(KeyCode::S) || is_key_down(KeyCode::Down),
            left: is_key_down(KeyCode::A) || is_key_down(KeyCode::Left),
            right: is_key_down(KeyCode::D) || is_key_down(KeyCode::Right),
        }
    }

    /// Cancels opposite pairs per axis, so holding left+right (or up+down)
    /// produces no movement on that axis before any event is generated.
    fn cancelled(self) -> Self {
        let mut keys = self;
        if keys.left && keys.right {
            keys.left = false;
            keys.right = false;
        }
        if keys.up && keys.down {
            keys.up = false;
            keys.down = false;
        }
        keys
    }
}

/// Translates one tick of held keys into outbound events.
///
/// One move event per held direction, with `advance_frame` set only on the
/// first so the animation phase advances once per tick no matter how many
/// directions are held; a single idle event when nothing is held.
pub fn events_for_tick(id: &str, keys: HeldKeys) -> Vec<Event> {
    let keys = keys.cancelled();

    let mut directions = Vec::new();
    if keys.left {
        directions.push(Direction::Left);
    }
    if keys.right {
        directions.push(Direction::Right);
    }
    if keys.up {
        directions.push(Direction::Up);
    }
    if keys.down {
        directions.push(Direction::Down);
    }

    if directions.is_empty() {
        return vec![Event::Idle { id: id.to_string() }];
    }

    directions
        .into_iter()
        .enumerate()
        .map(|(i, direction)| Event::Move {
            id: id.to_string(),
            direction,
            advance_frame: i == 0,
        })
        .collect()
}
