//! Coordinate and numeric carrier types shared by assemblers, atlas and gfx.
//!
//! Canonical CPU space:
//! - Node-local pixels, origin at the node's anchor point
//! - +X right, +Y up
//! - World space is whatever the node's world matrix maps into
//!
//! These types are deliberately small. Anything heavier (quaternions, inverse
//! matrices) belongs to the scene graph, not the batching core.

mod color;
mod mat4;
mod rect;
mod size;
mod vec2;
mod viewport;

pub use color::{ColorRgba, Rgba8};
pub use mat4::Mat4;
pub use rect::Rect;
pub use size::Size;
pub use vec2::{Vec2, Vec3};
pub use viewport::Viewport;
