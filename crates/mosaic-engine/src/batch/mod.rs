//! Shared vertex/index storage.
//!
//! Renderables never own vertex memory. They hold a [`Chunk`]: a cursor into
//! one of the [`Batcher`]'s growable [`MeshBuffer`]s. The batcher also tracks
//! the per-frame running index offset and splits draw batches whenever the
//! material/texture pair changes.
//!
//! Vertex record layout (`FLOAT_STRIDE` floats):
//!
//!  offset 0  x y z   world position
//!  offset 3  u v     texture coordinates
//!  offset 5  r g b a color

mod batcher;
mod error;
mod mesh_buffer;

pub use batcher::{BatchKey, Batcher, BatcherConfig, DrawBatch, MaterialId};
pub use error::{AllocError, AllocFailure};
pub use mesh_buffer::{Chunk, MeshBuffer};

/// Floats per vertex record.
pub const FLOAT_STRIDE: usize = 9;

/// Float offset of `u` inside a vertex record.
pub const UV_OFFSET: usize = 3;

/// Float offset of `r` inside a vertex record.
pub const COLOR_OFFSET: usize = 5;

/// Hard ceiling imposed by `u16` indices.
pub const MAX_VERTICES_PER_BUFFER: u32 = u16::MAX as u32;
