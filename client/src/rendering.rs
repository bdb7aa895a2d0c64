use macroquad::prelude::*;
use shared::{Activity, Avatar, Facing, FRAME_HEIGHT, FRAME_WIDTH};

const PLAYER_SCALE: f32 = 1.5;

pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Renderer
    }

    /// Draws one frame: the avatar list must already be sorted by ascending
    /// Y so later entries draw in front.
    pub fn draw(&self, avatars: &[Avatar], connected: bool) {
        clear_background(Color::from_rgba(34, 51, 34, 255));

        for avatar in avatars {
            self.draw_avatar(avatar);
        }

        self.draw_hud(avatars.len(), connected);
    }

    fn draw_avatar(&self, avatar: &Avatar) {
        let w = FRAME_WIDTH * PLAYER_SCALE;
        let h = FRAME_HEIGHT * PLAYER_SCALE;
        let x = avatar.x as f32;
        let y = avatar.y as f32;

        // Walk bob keyed off the shared frame index so every client shows
        // the same cadence.
        let bob = if avatar.activity == Activity::Moving {
            (avatar.frame_index() % 2) as f32 * 2.0
        } else {
            0.0
        };

        let body = match avatar.activity {
            Activity::Moving => Color::from_rgba(222, 184, 135, 255),
            Activity::Idle => Color::from_rgba(188, 152, 106, 255),
        };

        draw_rectangle(x, y + bob, w, h - bob, body);
        draw_rectangle_lines(x, y + bob, w, h - bob, 2.0, WHITE);

        // Eye marker mirrored by horizontal facing.
        let eye_x = match avatar.facing {
            Facing::Right => x + w - 8.0,
            Facing::Left => x + 4.0,
        };
        draw_rectangle(eye_x, y + bob + 6.0, 4.0, 4.0, BLACK);
    }

    fn draw_hud(&self, avatar_count: usize, connected: bool) {
        let connection_color = if connected { GREEN } else { RED };
        draw_rectangle(10.0, 10.0, 8.0, 8.0, connection_color);
        draw_text("CON", 22.0, 18.0, 12.0, WHITE);

        let count_text = format!("{} avatars", avatar_count);
        draw_text(&count_text, 10.0, 34.0, 12.0, WHITE);

        if !connected {
            let msg = "DISCONNECTED";
            let size = measure_text(msg, None, 32, 1.0);
            draw_text(
                msg,
                screen_width() / 2.0 - size.width / 2.0,
                screen_height() / 2.0,
                32.0,
                RED,
            );
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
