//! Per-renderable vertex state.
//!
//! [`RenderData`] keeps the local-space logical vertices an assembler computed
//! and a [`Chunk`] cursor into shared mesh storage. It owns no GPU memory.
//! Every method that needs the chunk silently does nothing when the renderable
//! has not been allocated yet; that happens routinely during construction.

use crate::batch::{AllocError, Batcher, Chunk, COLOR_OFFSET, FLOAT_STRIDE, UV_OFFSET};
use crate::coords::{ColorRgba, Mat4, Vec2};

/// One logical vertex in node-local space.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct LocalVertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub u: f32,
    pub v: f32,
    pub color: ColorRgba,
}

#[derive(Debug, Default)]
pub struct RenderData {
    data: Vec<LocalVertex>,
    chunk: Option<Chunk>,
    indices: Vec<u16>,
    vert_dirty: bool,
    world_updates: u64,
}

impl RenderData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a chunk sized for `vertex_count` vertices / `index_count`
    /// indices. An existing chunk of the same shape is kept.
    ///
    /// On failure the render data is left unallocated.
    pub fn allocate(
        &mut self,
        batcher: &mut Batcher,
        vertex_count: u32,
        index_count: u32,
    ) -> Result<(), AllocError> {
        if let Some(chunk) = &self.chunk {
            if chunk.vertex_count == vertex_count && chunk.index_count == index_count {
                self.vert_dirty = true;
                return Ok(());
            }
        }
        self.release(batcher);

        let chunk = batcher.request_chunk(vertex_count, index_count)?;
        self.chunk = Some(chunk);
        self.data.clear();
        self.data.resize(vertex_count as usize, LocalVertex::default());
        self.indices.clear();
        self.indices.resize(index_count as usize, 0);
        self.vert_dirty = true;
        Ok(())
    }

    /// Hands the chunk back to its mesh buffer.
    pub fn release(&mut self, batcher: &mut Batcher) {
        if let Some(chunk) = self.chunk.take() {
            batcher.release_chunk(&chunk);
        }
        self.data.clear();
        self.indices.clear();
    }

    #[inline]
    pub fn chunk(&self) -> Option<&Chunk> {
        self.chunk.as_ref()
    }

    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.chunk.is_some()
    }

    #[inline]
    pub fn data_length(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn data(&self) -> &[LocalVertex] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [LocalVertex] {
        &mut self.data
    }

    #[inline]
    pub fn index_pattern(&self) -> &[u16] {
        &self.indices
    }

    /// Stores the chunk-local triangulation used by every later
    /// [`append_indices`](Self::append_indices).
    pub fn write_index_buffer(&mut self, indices: &[u16]) {
        if indices.len() != self.indices.len() {
            log::debug!(
                "render data: index pattern of {} entries for a {}-index chunk",
                indices.len(),
                self.indices.len()
            );
        }
        let n = indices.len().min(self.indices.len());
        self.indices[..n].copy_from_slice(&indices[..n]);
        self.indices[n..].fill(0);
    }

    #[inline]
    pub fn set_vertex_dirty(&mut self) {
        self.vert_dirty = true;
    }

    #[inline]
    pub fn clear_vertex_dirty(&mut self) {
        self.vert_dirty = false;
    }

    #[inline]
    pub fn vert_dirty(&self) -> bool {
        self.vert_dirty
    }

    /// How many times world-space positions were recomputed.
    #[inline]
    pub fn world_updates(&self) -> u64 {
        self.world_updates
    }

    /// The chunk's interleaved floats inside shared storage.
    pub fn vertices_mut<'b>(&self, batcher: &'b mut Batcher) -> Option<&'b mut [f32]> {
        batcher.vertices_mut(self.chunk.as_ref()?)
    }

    /// Writes the index pattern at the batcher's running index offset.
    pub fn append_indices(&self, batcher: &mut Batcher) {
        if let Some(chunk) = &self.chunk {
            batcher.append_indices(chunk, &self.indices);
        }
    }

    /// Transforms every logical vertex by `world` into the chunk's xyz slots.
    pub fn update_world_vertices(&mut self, batcher: &mut Batcher, world: &Mat4) {
        let Some(chunk) = &self.chunk else { return };
        let Some(vb) = batcher.vertices_mut(chunk) else { return };

        for (local, record) in self.data.iter().zip(vb.chunks_exact_mut(FLOAT_STRIDE)) {
            let [x, y, z] = world.transform_point2(Vec2::new(local.x, local.y));
            record[0] = x;
            record[1] = y;
            record[2] = z;
        }
        self.world_updates += 1;
    }

    /// Writes per-vertex UVs into the chunk and the logical vertices.
    /// Extra entries on either side are ignored.
    pub fn write_uvs(&mut self, batcher: &mut Batcher, uvs: &[[f32; 2]]) {
        let Some(chunk) = &self.chunk else { return };
        let Some(vb) = batcher.vertices_mut(chunk) else { return };

        let records = vb.chunks_exact_mut(FLOAT_STRIDE);
        for ((local, record), &[u, v]) in self.data.iter_mut().zip(records).zip(uvs) {
            record[UV_OFFSET] = u;
            record[UV_OFFSET + 1] = v;
            local.u = u;
            local.v = v;
        }
    }

    /// Writes `color` into every vertex record and logical vertex.
    pub fn write_color(&mut self, batcher: &mut Batcher, color: ColorRgba) {
        for local in &mut self.data {
            local.color = color;
        }
        self.upload_colors(batcher);
    }

    /// Copies each logical vertex's color into its record.
    pub fn upload_colors(&self, batcher: &mut Batcher) {
        let Some(chunk) = &self.chunk else { return };
        let Some(vb) = batcher.vertices_mut(chunk) else { return };

        for (local, record) in self.data.iter().zip(vb.chunks_exact_mut(FLOAT_STRIDE)) {
            record[COLOR_OFFSET..COLOR_OFFSET + 4].copy_from_slice(&local.color.to_array());
        }
    }
}
