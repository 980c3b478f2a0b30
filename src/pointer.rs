//! Pointer tracking for interactive splats.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::color::Rgb;

/// Identifier of a pointer slot that is not bound to any device pointer.
pub const FREE_POINTER: i32 = -1;

/// The drawing surface input coordinates are relative to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    /// Width in device pixels.
    pub width: u32,
    /// Height in device pixels.
    pub height: u32,
    /// Device pixels per input unit.
    #[serde(default = "default_pixel_ratio")]
    pub pixel_ratio: f32,
}

fn default_pixel_ratio() -> f32 {
    1.0
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: 1.0,
        }
    }

    pub fn with_pixel_ratio(mut self, pixel_ratio: f32) -> Self {
        self.pixel_ratio = pixel_ratio;
        self
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Input units to whole device pixels.
    pub fn scale_by_pixel_ratio(&self, input: f32) -> f32 {
        (input * self.pixel_ratio).floor()
    }

    /// Device pixel position to texture coordinates, origin bottom-left.
    pub fn texcoord(&self, pos_x: f32, pos_y: f32) -> Vec2 {
        Vec2::new(
            pos_x / self.width.max(1) as f32,
            1.0 - pos_y / self.height.max(1) as f32,
        )
    }

    /// Horizontal deltas shrink on portrait surfaces.
    pub fn correct_delta_x(&self, delta: f32) -> f32 {
        let aspect = self.aspect_ratio();
        if aspect < 1.0 { delta * aspect } else { delta }
    }

    /// Vertical deltas shrink on landscape surfaces.
    pub fn correct_delta_y(&self, delta: f32) -> f32 {
        let aspect = self.aspect_ratio();
        if aspect > 1.0 { delta / aspect } else { delta }
    }
}

/// State of one tracked pointer.
#[derive(Clone, Debug, PartialEq)]
pub struct PointerData {
    pub id: i32,
    pub texcoord: Vec2,
    pub prev_texcoord: Vec2,
    pub delta: Vec2,
    pub down: bool,
    /// Set by a move with a non-zero delta, cleared by [`take_moved`](Self::take_moved).
    pub moved: bool,
    pub color: Rgb,
}

impl Default for PointerData {
    fn default() -> Self {
        Self {
            id: FREE_POINTER,
            texcoord: Vec2::ZERO,
            prev_texcoord: Vec2::ZERO,
            delta: Vec2::ZERO,
            down: false,
            moved: false,
            color: Rgb::new(0.3, 0.0, 0.7),
        }
    }
}

impl PointerData {
    /// Press at device pixel `(pos_x, pos_y)`.
    pub fn press(&mut self, surface: &Surface, id: i32, pos_x: f32, pos_y: f32, color: Rgb) {
        self.id = id;
        self.down = true;
        self.moved = false;
        self.texcoord = surface.texcoord(pos_x, pos_y);
        self.prev_texcoord = self.texcoord;
        self.delta = Vec2::ZERO;
        self.color = color;
    }

    /// Move to device pixel `(pos_x, pos_y)`.
    pub fn move_to(&mut self, surface: &Surface, pos_x: f32, pos_y: f32) {
        self.prev_texcoord = self.texcoord;
        self.texcoord = surface.texcoord(pos_x, pos_y);
        let raw = self.texcoord - self.prev_texcoord;
        self.delta = Vec2::new(surface.correct_delta_x(raw.x), surface.correct_delta_y(raw.y));
        self.moved = self.delta.x.abs() > 0.0 || self.delta.y.abs() > 0.0;
    }

    /// Release. Position and deltas stay at their last values.
    pub fn release(&mut self) {
        self.down = false;
    }

    /// Consume the moved edge.
    pub fn take_moved(&mut self) -> bool {
        std::mem::take(&mut self.moved)
    }
}
