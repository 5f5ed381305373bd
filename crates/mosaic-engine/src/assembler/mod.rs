//! Assemblers turn component state into vertex/index data.
//!
//! Each shape kind has one stateless assembler, shared as a `static`. A
//! component picks its assembler by value (see [`Sprite::assembler`]) and
//! passes itself in on every call, so assemblers never hold component state.
//!
//! Per frame, for every renderable:
//! 1. `update_render_data`: refresh local geometry, UVs and color if dirty
//! 2. `fill_buffers`: write world-space vertices when the node moved or the
//!    geometry changed, then append the index pattern
//!
//! [`Sprite::assembler`]: crate::sprite::Sprite::assembler

mod bar_filled;
mod error;
mod graphics;
mod simple;
mod sliced;

pub use bar_filled::{BarFilled, normalize_fill};
pub use error::AssembleError;
pub use graphics::{Graphics, GraphicsAssembler};
pub use simple::{QUAD_INDICES, Simple};
pub use sliced::{SLICED_INDICES, Sliced};

use crate::atlas::DynamicAtlasManager;
use crate::batch::Batcher;
use crate::node::TransformSource;
use crate::render_data::RenderData;

pub static SIMPLE: Simple = Simple;
pub static SLICED: Sliced = Sliced;
pub static BAR_FILLED: BarFilled = BarFilled;
pub static GRAPHICS: GraphicsAssembler = GraphicsAssembler;

/// Geometry strategy for one component type.
pub trait Assembler: Sync {
    type Component;

    /// Allocates render data and installs the index pattern.
    fn create_data(&self, comp: &mut Self::Component, batcher: &mut Batcher) -> Result<(), AssembleError>;

    /// Frame-start refresh: atlas packing, UVs, local vertices when dirty.
    fn update_render_data(
        &self,
        comp: &mut Self::Component,
        node: &dyn TransformSource,
        batcher: &mut Batcher,
        atlas: Option<&mut DynamicAtlasManager>,
    ) -> Result<(), AssembleError>;

    fn update_uvs(&self, comp: &mut Self::Component, batcher: &mut Batcher) -> Result<(), AssembleError>;

    /// Local-space positions from node size/anchor and component settings.
    fn update_vertex_data(
        &self,
        comp: &mut Self::Component,
        node: &dyn TransformSource,
    ) -> Result<(), AssembleError>;

    /// World vertices (when needed) plus indices at the running offset.
    fn fill_buffers(&self, comp: &mut Self::Component, node: &dyn TransformSource, batcher: &mut Batcher);

    fn update_color(&self, comp: &mut Self::Component, node: &dyn TransformSource, batcher: &mut Batcher);
}

/// Shared `fill_buffers` body.
///
/// World positions are recomputed only when the local geometry is dirty or
/// the node's transform version moved past `seen_version`.
pub(crate) fn fill_render_data(
    rd: &mut RenderData,
    seen_version: &mut Option<u32>,
    node: &dyn TransformSource,
    batcher: &mut Batcher,
) {
    if !rd.is_allocated() {
        return;
    }
    let version = node.transform_version();
    if rd.vert_dirty() || *seen_version != Some(version) {
        rd.update_world_vertices(batcher, node.world_matrix());
        rd.clear_vertex_dirty();
        *seen_version = Some(version);
    }
    rd.append_indices(batcher);
}

/// Left/bottom/right/top of the node's content rect around its anchor.
pub(crate) fn content_bounds(node: &dyn TransformSource) -> (f32, f32, f32, f32) {
    let size = node.content_size();
    let anchor = node.anchor();
    let app_x = anchor.x * size.width;
    let app_y = anchor.y * size.height;
    (-app_x, -app_y, size.width - app_x, size.height - app_y)
}
