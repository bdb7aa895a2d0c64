use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Logical canvas the world is laid out on. Avatars spawn at its midpoint
/// and positions are otherwise unconstrained (no clamping).
pub const SCREEN_WIDTH: f64 = 640.0;
pub const SCREEN_HEIGHT: f64 = 480.0;
pub const SPAWN_X: f64 = SCREEN_WIDTH / 2.0;
pub const SPAWN_Y: f64 = SCREEN_HEIGHT / 2.0;

/// Position delta applied per move event.
pub const PLAYER_SPEED: f64 = 2.0;

/// Scalar mapping the animation phase counter to a discrete frame index.
pub const ANIMATION_SPEED: f64 = 0.2;

/// Sprite sheet geometry for the presentation layer. `FRAME_WRAP` is the
/// phase wrap threshold and is deliberately hard-coded to 7 rather than
/// derived from `FRAME_COUNT`; the pair is coupled to keep the 8-frame
/// walk cadence identical on every client.
pub const FRAME_COUNT: u32 = 8;
pub const FRAME_WRAP: u32 = 7;
pub const FRAME_WIDTH: f32 = 21.0;
pub const FRAME_HEIGHT: f32 = 33.0;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    None,
    Up,
    Down,
    Left,
    Right,
}

/// Horizontal facing for sprite mirroring. Only left/right moves update it,
/// so it survives vertical movement and idling.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Left,
    Right,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    Idle,
    Moving,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Avatar {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub direction: Direction,
    pub facing: Facing,
    pub activity: Activity,
    pub frame: f64,
}

impl Avatar {
    /// Creates an avatar in its initial state at the canvas midpoint.
    pub fn spawn(id: &str) -> Self {
        Self {
            id: id.to_string(),
            x: SPAWN_X,
            y: SPAWN_Y,
            direction: Direction::None,
            facing: Facing::Right,
            activity: Activity::Idle,
            frame: 0.0,
        }
    }

    /// Advances the animation phase by one tick signal.
    ///
    /// The wrap check compares the derived frame index against `FRAME_WRAP`,
    /// not the raw phase, so the phase runs 0..=34 before resetting.
    pub fn advance_frame(&mut self) {
        if (self.frame * ANIMATION_SPEED).floor() >= FRAME_WRAP as f64 {
            self.frame = 0.0;
        } else {
            self.frame += 1.0;
        }
    }

    /// Discrete frame index for the presentation layer (0..FRAME_COUNT).
    pub fn frame_index(&self) -> u32 {
        (self.frame * ANIMATION_SPEED).floor() as u32
    }

    /// X offset of the current frame in the sprite sheet.
    pub fn sprite_column(&self) -> f32 {
        self.frame_index() as f32 * FRAME_WIDTH
    }
}

/// World invariant violations surfaced by [`World::apply`]. The offending
/// event is discarded by callers; the world is left untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("unknown avatar '{0}'")]
    UnknownAvatar(String),
    #[error("duplicate identity '{0}'")]
    DuplicateIdentity(String),
}

/// Wire decode failure: the message was not valid JSON or its payload did
/// not match the shape expected for its kind.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// One wire message. The tag is closed: adding a kind here forces every
/// decode/apply match site to handle it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Event {
    Init {
        id: String,
        avatar: Avatar,
    },
    Move {
        id: String,
        direction: Direction,
        advance_frame: bool,
    },
    Idle {
        id: String,
    },
    Snapshot {
        avatars: HashMap<String, Avatar>,
    },
}

impl Event {
    /// Builds the handshake event for a brand-new player and returns it
    /// together with the generated identity token.
    pub fn new_player_init() -> (Event, String) {
        let id = Uuid::new_v4().to_string();
        let event = Event::Init {
            id: id.clone(),
            avatar: Avatar::spawn(&id),
        };
        (event, id)
    }

    /// Encodes the event as a single-pass JSON wire message.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decodes one wire message.
    pub fn decode(text: &str) -> Result<Event, DecodeError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct World {
    pub avatars: HashMap<String, Avatar>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event to the world. Validation happens before any
    /// mutation, so a failed apply leaves the world unchanged.
    pub fn apply(&mut self, event: &Event) -> Result<(), ApplyError> {
        match event {
            Event::Init { id, avatar } => {
                if self.avatars.contains_key(id) {
                    return Err(ApplyError::DuplicateIdentity(id.clone()));
                }
                self.avatars.insert(id.clone(), avatar.clone());
            }

            Event::Move {
                id,
                direction,
                advance_frame,
            } => {
                let avatar = self
                    .avatars
                    .get_mut(id)
                    .ok_or_else(|| ApplyError::UnknownAvatar(id.clone()))?;

                avatar.direction = *direction;
                match direction {
                    Direction::Up => avatar.y -= PLAYER_SPEED,
                    Direction::Down => avatar.y += PLAYER_SPEED,
                    Direction::Left => {
                        avatar.x -= PLAYER_SPEED;
                        avatar.facing = Facing::Left;
                    }
                    Direction::Right => {
                        avatar.x += PLAYER_SPEED;
                        avatar.facing = Facing::Right;
                    }
                    Direction::None => {}
                }
                avatar.activity = Activity::Moving;
                if *advance_frame {
                    avatar.advance_frame();
                }
            }

            Event::Idle { id } => {
                let avatar = self
                    .avatars
                    .get_mut(id)
                    .ok_or_else(|| ApplyError::UnknownAvatar(id.clone()))?;
                avatar.activity = Activity::Idle;
                avatar.advance_frame();
            }

            Event::Snapshot { avatars } => {
                // Wholesale replacement; prior content is discarded, never merged.
                self.avatars = avatars.clone();
            }
        }

        Ok(())
    }

    /// Removes an avatar, returning it if present. Used when a session closes.
    pub fn remove(&mut self, id: &str) -> Option<Avatar> {
        self.avatars.remove(id)
    }

    /// Serializable snapshot event of the current world contents.
    pub fn snapshot_event(&self) -> Event {
        Event::Snapshot {
            avatars: self.avatars.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn world_with(ids: &[&str]) -> World {
        let mut world = World::new();
        for id in ids {
            world
                .apply(&Event::Init {
                    id: id.to_string(),
                    avatar: Avatar::spawn(id),
                })
                .unwrap();
        }
        world
    }

    #[test]
    fn test_avatar_spawn_state() {
        let avatar = Avatar::spawn("p1");
        assert_eq!(avatar.id, "p1");
        assert_approx_eq!(avatar.x, 320.0);
        assert_approx_eq!(avatar.y, 240.0);
        assert_eq!(avatar.direction, Direction::None);
        assert_eq!(avatar.facing, Facing::Right);
        assert_eq!(avatar.activity, Activity::Idle);
        assert_eq!(avatar.frame, 0.0);
    }

    #[test]
    fn test_init_duplicate_identity_rejected() {
        let mut world = world_with(&["p1"]);
        let before = world.clone();

        let result = world.apply(&Event::Init {
            id: "p1".to_string(),
            avatar: Avatar::spawn("p1"),
        });

        assert_eq!(result, Err(ApplyError::DuplicateIdentity("p1".to_string())));
        assert_eq!(world, before);
    }

    #[test]
    fn test_move_deltas_per_direction() {
        let cases = [
            (Direction::Up, 0.0, -PLAYER_SPEED),
            (Direction::Down, 0.0, PLAYER_SPEED),
            (Direction::Left, -PLAYER_SPEED, 0.0),
            (Direction::Right, PLAYER_SPEED, 0.0),
            (Direction::None, 0.0, 0.0),
        ];

        for (direction, dx, dy) in cases {
            let mut world = world_with(&["p1"]);
            world
                .apply(&Event::Move {
                    id: "p1".to_string(),
                    direction,
                    advance_frame: false,
                })
                .unwrap();

            let avatar = &world.avatars["p1"];
            assert_approx_eq!(avatar.x, SPAWN_X + dx);
            assert_approx_eq!(avatar.y, SPAWN_Y + dy);
            assert_eq!(avatar.direction, direction);
            assert_eq!(avatar.activity, Activity::Moving);
        }
    }

    #[test]
    fn test_move_leaves_other_avatars_unchanged() {
        let mut world = world_with(&["p1", "p2"]);
        let p2_before = world.avatars["p2"].clone();

        world
            .apply(&Event::Move {
                id: "p1".to_string(),
                direction: Direction::Up,
                advance_frame: true,
            })
            .unwrap();

        assert_eq!(world.avatars["p2"], p2_before);
    }

    #[test]
    fn test_facing_persists_across_vertical_and_idle() {
        let mut world = world_with(&["p1"]);

        world
            .apply(&Event::Move {
                id: "p1".to_string(),
                direction: Direction::Left,
                advance_frame: false,
            })
            .unwrap();
        assert_eq!(world.avatars["p1"].facing, Facing::Left);

        world
            .apply(&Event::Move {
                id: "p1".to_string(),
                direction: Direction::Up,
                advance_frame: false,
            })
            .unwrap();
        assert_eq!(world.avatars["p1"].facing, Facing::Left);

        world
            .apply(&Event::Idle {
                id: "p1".to_string(),
            })
            .unwrap();
        assert_eq!(world.avatars["p1"].facing, Facing::Left);
    }

    #[test]
    fn test_move_advance_frame_flag() {
        let mut world = world_with(&["p1"]);

        world
            .apply(&Event::Move {
                id: "p1".to_string(),
                direction: Direction::Right,
                advance_frame: false,
            })
            .unwrap();
        assert_eq!(world.avatars["p1"].frame, 0.0);

        world
            .apply(&Event::Move {
                id: "p1".to_string(),
                direction: Direction::Right,
                advance_frame: true,
            })
            .unwrap();
        assert_eq!(world.avatars["p1"].frame, 1.0);
    }

    #[test]
    fn test_idle_always_advances_frame() {
        let mut world = world_with(&["p1"]);

        // From idle
        world
            .apply(&Event::Idle {
                id: "p1".to_string(),
            })
            .unwrap();
        assert_eq!(world.avatars["p1"].frame, 1.0);
        assert_eq!(world.avatars["p1"].activity, Activity::Idle);

        // From moving
        world
            .apply(&Event::Move {
                id: "p1".to_string(),
                direction: Direction::Down,
                advance_frame: false,
            })
            .unwrap();
        world
            .apply(&Event::Idle {
                id: "p1".to_string(),
            })
            .unwrap();
        assert_eq!(world.avatars["p1"].frame, 2.0);
        assert_eq!(world.avatars["p1"].activity, Activity::Idle);
    }

    #[test]
    fn test_frame_wraps_after_exactly_35_advances() {
        let mut avatar = Avatar::spawn("p1");

        for step in 1..=34 {
            avatar.advance_frame();
            assert_eq!(avatar.frame, step as f64);
        }
        assert_eq!(avatar.frame_index(), 6);

        // 35th advance reaches phase 35, frame index 7...
        avatar.advance_frame();
        assert_eq!(avatar.frame, 35.0);
        assert_eq!(avatar.frame_index(), FRAME_WRAP);

        // ...and the next tick signal wraps back to phase 0.
        avatar.advance_frame();
        assert_eq!(avatar.frame, 0.0);
        assert_eq!(avatar.frame_index(), 0);
    }

    #[test]
    fn test_frame_index_derivation() {
        let mut avatar = Avatar::spawn("p1");
        avatar.frame = 12.0;
        assert_eq!(avatar.frame_index(), 2);
        assert_approx_eq!(avatar.sprite_column(), 2.0 * FRAME_WIDTH);
    }

    #[test]
    fn test_unknown_avatar_move_and_idle() {
        let mut world = world_with(&["p1"]);
        let before = world.clone();

        let move_result = world.apply(&Event::Move {
            id: "ghost".to_string(),
            direction: Direction::Left,
            advance_frame: true,
        });
        assert_eq!(
            move_result,
            Err(ApplyError::UnknownAvatar("ghost".to_string()))
        );
        assert_eq!(world, before);

        let idle_result = world.apply(&Event::Idle {
            id: "ghost".to_string(),
        });
        assert_eq!(
            idle_result,
            Err(ApplyError::UnknownAvatar("ghost".to_string()))
        );
        assert_eq!(world, before);
    }

    #[test]
    fn test_snapshot_replaces_wholesale() {
        let mut world = world_with(&["stale1", "stale2"]);

        let mut avatars = HashMap::new();
        avatars.insert("p9".to_string(), Avatar::spawn("p9"));
        let snapshot = Event::Snapshot { avatars };

        world.apply(&snapshot).unwrap();
        assert_eq!(world.avatars.len(), 1);
        assert!(world.avatars.contains_key("p9"));
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        let source = world_with(&["p1", "p2"]);
        let snapshot = source.snapshot_event();

        let mut world = World::new();
        world.apply(&snapshot).unwrap();
        let once = world.clone();
        world.apply(&snapshot).unwrap();

        assert_eq!(world, once);
    }

    #[test]
    fn test_remove_avatar() {
        let mut world = world_with(&["p1", "p2"]);
        assert!(world.remove("p1").is_some());
        assert!(world.remove("p1").is_none());
        assert_eq!(world.avatars.len(), 1);
    }

    #[test]
    fn test_new_player_init_ids_are_unique() {
        let (event, id) = Event::new_player_init();
        let (_, other_id) = Event::new_player_init();
        assert_ne!(id, other_id);

        match event {
            Event::Init {
                id: event_id,
                avatar,
            } => {
                assert_eq!(event_id, id);
                assert_eq!(avatar.id, id);
                assert_approx_eq!(avatar.x, SPAWN_X);
                assert_approx_eq!(avatar.y, SPAWN_Y);
            }
            _ => panic!("Wrong event kind for handshake"),
        }
    }

    #[test]
    fn test_event_json_roundtrip() {
        let events = vec![
            Event::Init {
                id: "p1".to_string(),
                avatar: Avatar::spawn("p1"),
            },
            Event::Move {
                id: "p1".to_string(),
                direction: Direction::Right,
                advance_frame: true,
            },
            Event::Idle {
                id: "p1".to_string(),
            },
            world_with(&["p1", "p2"]).snapshot_event(),
        ];

        for event in events {
            let encoded = event.encode().unwrap();
            let decoded = Event::decode(&encoded).unwrap();
            assert_eq!(decoded, event);
        }
    }

    #[test]
    fn test_decode_rejects_malformed_payloads() {
        // Not JSON at all
        assert!(Event::decode("not json").is_err());

        // Unknown kind tag
        assert!(Event::decode(r#"{"type":"teleport","data":{"id":"p1"}}"#).is_err());

        // Kind/payload shape mismatch: move payload missing its fields
        assert!(Event::decode(r#"{"type":"move","data":{"id":"p1"}}"#).is_err());

        // Idle-shaped payload where a snapshot map is expected
        assert!(Event::decode(r#"{"type":"snapshot","data":{"id":"p1"}}"#).is_err());

        let err = Event::decode("{").unwrap_err();
        assert!(matches!(err, DecodeError::MalformedPayload(_)));
    }
}
