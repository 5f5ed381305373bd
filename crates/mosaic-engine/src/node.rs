//! Scene-graph boundary.
//!
//! The batching core never owns nodes. It reads their state through
//! [`TransformSource`] and compares the monotonic transform version against a
//! snapshot held by each renderable, so the per-frame path needs no callbacks.

use crate::coords::{Mat4, Size, Vec2};

/// Read-only view of a node as seen by assemblers.
pub trait TransformSource {
    /// Node-to-world matrix.
    fn world_matrix(&self) -> &Mat4;

    /// Incremented every time the world matrix changes.
    fn transform_version(&self) -> u32;

    /// UI content size in local pixels.
    fn content_size(&self) -> Size;

    /// Normalized anchor point (`0.5, 0.5` is centered).
    fn anchor(&self) -> Vec2;

    /// Hierarchically composed opacity in `[0, 1]`.
    fn opacity(&self) -> f32;
}

/// Minimal concrete node.
///
/// Every setter that changes the world matrix bumps the version.
#[derive(Debug, Clone)]
pub struct UiNode {
    world: Mat4,
    version: u32,
    content_size: Size,
    anchor: Vec2,
    opacity: f32,
}

impl Default for UiNode {
    fn default() -> Self {
        Self {
            world: Mat4::IDENTITY,
            version: 0,
            content_size: Size::new(100.0, 100.0),
            anchor: Vec2::new(0.5, 0.5),
            opacity: 1.0,
        }
    }
}

impl UiNode {
    pub fn new(content_size: Size) -> Self {
        Self { content_size, ..Self::default() }
    }

    pub fn set_world_matrix(&mut self, world: Mat4) {
        self.world = world;
        self.version = self.version.wrapping_add(1);
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.set_world_matrix(Mat4::from_translation(x, y, 0.0));
    }

    pub fn set_content_size(&mut self, size: Size) {
        self.content_size = size;
    }

    pub fn set_anchor(&mut self, anchor: Vec2) {
        self.anchor = anchor;
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }
}

impl TransformSource for UiNode {
    fn world_matrix(&self) -> &Mat4 {
        &self.world
    }

    fn transform_version(&self) -> u32 {
        self.version
    }

    fn content_size(&self) -> Size {
        self.content_size
    }

    fn anchor(&self) -> Vec2 {
        self.anchor
    }

    fn opacity(&self) -> f32 {
        self.opacity
    }
}
