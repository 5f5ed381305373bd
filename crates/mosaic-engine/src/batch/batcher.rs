use crate::texture::TextureId;

use super::{AllocError, AllocFailure, Chunk, MeshBuffer, MAX_VERTICES_PER_BUFFER};

/// Opaque material identity. Shader parameters stay with the material owner.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct MaterialId(pub u32);

/// Everything that forces a new draw call when it changes.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct BatchKey {
    pub material: MaterialId,
    pub texture: Option<TextureId>,
}

impl BatchKey {
    #[inline]
    pub const fn new(material: MaterialId, texture: Option<TextureId>) -> Self {
        Self { material, texture }
    }
}

/// A contiguous run of indices in one mesh buffer sharing one [`BatchKey`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DrawBatch {
    pub key: BatchKey,
    pub buffer_id: u16,
    pub index_start: u32,
    pub index_count: u32,
}

/// Sizing policy for the shared mesh storage.
#[derive(Debug, Clone)]
pub struct BatcherConfig {
    /// Vertices reserved up front in every new mesh buffer.
    pub initial_vertices: u32,

    /// Upper bound per mesh buffer. Clamped to the `u16` index range.
    pub max_vertices_per_buffer: u32,

    /// Number of mesh buffers the batcher may open before requests fail.
    pub max_buffers: usize,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            initial_vertices: 1024,
            max_vertices_per_buffer: MAX_VERTICES_PER_BUFFER,
            max_buffers: 8,
        }
    }
}

/// Owner of every [`MeshBuffer`] and of the per-frame draw-batch list.
///
/// Frame protocol:
/// 1. [`begin_frame`](Self::begin_frame) rewinds index offsets
/// 2. per renderable: [`commit`](Self::commit) with its key, then the
///    assembler's `fill_buffers`
/// 3. [`end_frame`](Self::end_frame) closes the last batch and returns the list
#[derive(Debug)]
pub struct Batcher {
    config: BatcherConfig,
    buffers: Vec<MeshBuffer>,
    batches: Vec<DrawBatch>,
    open: Option<DrawBatch>,
}

impl Default for Batcher {
    fn default() -> Self {
        Self::new(BatcherConfig::default())
    }
}

impl Batcher {
    pub fn new(config: BatcherConfig) -> Self {
        let mut config = config;
        config.max_vertices_per_buffer = config.max_vertices_per_buffer.min(MAX_VERTICES_PER_BUFFER);
        config.max_buffers = config.max_buffers.clamp(1, u16::MAX as usize);
        Self { config, buffers: Vec::new(), batches: Vec::new(), open: None }
    }

    #[inline]
    pub fn config(&self) -> &BatcherConfig {
        &self.config
    }

    #[inline]
    pub fn buffers(&self) -> &[MeshBuffer] {
        &self.buffers
    }

    #[inline]
    pub fn buffer(&self, id: u16) -> Option<&MeshBuffer> {
        self.buffers.get(id as usize)
    }

    /// Allocates a chunk from the first buffer with room, opening a new
    /// buffer when all existing ones are full.
    pub fn request_chunk(&mut self, vertex_count: u32, index_count: u32) -> Result<Chunk, AllocError> {
        let fail = |reason| AllocError { vertex_count, index_count, reason };

        if vertex_count > self.config.max_vertices_per_buffer {
            return Err(fail(AllocFailure::ExceedsBufferLimit));
        }

        for buffer in &mut self.buffers {
            if let Some(chunk) = buffer.request(vertex_count, index_count) {
                return Ok(chunk);
            }
        }

        if self.buffers.len() >= self.config.max_buffers {
            log::warn!(
                "batcher: {} mesh buffers exhausted; dropping {vertex_count}-vertex request",
                self.buffers.len()
            );
            return Err(fail(AllocFailure::OutOfBuffers));
        }

        let id = self.buffers.len() as u16;
        let mut buffer = MeshBuffer::new(
            id,
            self.config.initial_vertices,
            self.config.max_vertices_per_buffer,
        );
        let chunk = buffer.request(vertex_count, index_count).ok_or_else(|| fail(AllocFailure::ExceedsBufferLimit))?;
        log::debug!("batcher: opened mesh buffer {id}");
        self.buffers.push(buffer);
        Ok(chunk)
    }

    pub fn release_chunk(&mut self, chunk: &Chunk) {
        match self.buffers.get_mut(chunk.buffer_id as usize) {
            Some(buffer) => buffer.release(chunk),
            None => log::debug!("batcher: release of chunk in unknown buffer {}", chunk.buffer_id),
        }
    }

    /// The chunk's float slice. `None` for a stale buffer id.
    pub fn vertices_mut(&mut self, chunk: &Chunk) -> Option<&mut [f32]> {
        let buffer = self.buffers.get_mut(chunk.buffer_id as usize)?;
        Some(buffer.vertices_mut(chunk))
    }

    pub fn vertices(&self, chunk: &Chunk) -> Option<&[f32]> {
        let buffer = self.buffers.get(chunk.buffer_id as usize)?;
        Some(buffer.vertices(chunk))
    }

    /// Appends a chunk-local index pattern at the owning buffer's running
    /// offset and advances it.
    pub fn append_indices(&mut self, chunk: &Chunk, pattern: &[u16]) {
        if let Some(buffer) = self.buffers.get_mut(chunk.buffer_id as usize) {
            buffer.append_indices(chunk, pattern);
        }
    }

    /// Rewinds every buffer's index stream and forgets last frame's batches.
    pub fn begin_frame(&mut self) {
        for buffer in &mut self.buffers {
            buffer.reset_index_offset();
        }
        self.batches.clear();
        self.open = None;
    }

    /// Declares that the next `fill_buffers` call writes into `chunk` under
    /// `key`. Opens a new batch when the key or buffer differs from the
    /// open one.
    pub fn commit(&mut self, key: BatchKey, chunk: &Chunk) {
        if let Some(open) = &self.open {
            if open.key == key && open.buffer_id == chunk.buffer_id {
                return;
            }
        }
        self.close_open_batch();

        let Some(buffer) = self.buffers.get(chunk.buffer_id as usize) else { return };
        self.open = Some(DrawBatch {
            key,
            buffer_id: chunk.buffer_id,
            index_start: buffer.index_offset() as u32,
            index_count: 0,
        });
    }

    /// Closes the open batch and returns this frame's batches in submit order.
    pub fn end_frame(&mut self) -> &[DrawBatch] {
        self.close_open_batch();
        &self.batches
    }

    /// Batches closed so far this frame.
    #[inline]
    pub fn batches(&self) -> &[DrawBatch] {
        &self.batches
    }

    fn close_open_batch(&mut self) {
        let Some(mut batch) = self.open.take() else { return };
        let Some(buffer) = self.buffers.get(batch.buffer_id as usize) else { return };
        batch.index_count = (buffer.index_offset() as u32).saturating_sub(batch.index_start);
        if batch.index_count > 0 {
            self.batches.push(batch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: [u16; 6] = [0, 1, 2, 1, 3, 2];

    fn small() -> Batcher {
        Batcher::new(BatcherConfig { initial_vertices: 4, max_vertices_per_buffer: 8, max_buffers: 2 })
    }

    // ── allocation ────────────────────────────────────────────────────────

    #[test]
    fn opens_second_buffer_when_first_is_full() {
        let mut b = small();
        let a = b.request_chunk(8, 12).unwrap();
        let c = b.request_chunk(4, 6).unwrap();
        assert_eq!(a.buffer_id, 0);
        assert_eq!(c.buffer_id, 1);
    }

    #[test]
    fn fails_when_out_of_buffers() {
        let mut b = small();
        b.request_chunk(8, 0).unwrap();
        b.request_chunk(8, 0).unwrap();
        let err = b.request_chunk(1, 0).unwrap_err();
        assert_eq!(err.reason, AllocFailure::OutOfBuffers);
    }

    #[test]
    fn oversized_request_fails_immediately() {
        let mut b = small();
        let err = b.request_chunk(9, 0).unwrap_err();
        assert_eq!(err.reason, AllocFailure::ExceedsBufferLimit);
        assert!(b.buffers().is_empty());
    }

    #[test]
    fn max_vertices_clamped_to_u16_range() {
        let b = Batcher::new(BatcherConfig { max_vertices_per_buffer: 1 << 20, ..Default::default() });
        assert_eq!(b.config().max_vertices_per_buffer, MAX_VERTICES_PER_BUFFER);
    }

    // ── batching ──────────────────────────────────────────────────────────

    #[test]
    fn same_key_extends_one_batch() {
        let mut b = Batcher::default();
        let a = b.request_chunk(4, 6).unwrap();
        let c = b.request_chunk(4, 6).unwrap();
        let key = BatchKey::new(MaterialId(1), Some(TextureId::next()));

        b.begin_frame();
        for chunk in [&a, &c] {
            b.commit(key, chunk);
            b.append_indices(chunk, &QUAD);
        }
        let batches = b.end_frame();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].index_start, 0);
        assert_eq!(batches[0].index_count, 12);
    }

    #[test]
    fn texture_change_splits_batches() {
        let mut b = Batcher::default();
        let a = b.request_chunk(4, 6).unwrap();
        let c = b.request_chunk(4, 6).unwrap();

        b.begin_frame();
        b.commit(BatchKey::new(MaterialId(0), Some(TextureId::next())), &a);
        b.append_indices(&a, &QUAD);
        b.commit(BatchKey::new(MaterialId(0), Some(TextureId::next())), &c);
        b.append_indices(&c, &QUAD);
        let batches = b.end_frame();

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].index_start, 6);
        assert_eq!(batches[1].index_count, 6);
    }

    #[test]
    fn empty_batches_are_dropped() {
        let mut b = Batcher::default();
        let a = b.request_chunk(4, 6).unwrap();
        b.begin_frame();
        b.commit(BatchKey::default(), &a);
        assert!(b.end_frame().is_empty());
    }

    #[test]
    fn begin_frame_rewinds_indices() {
        let mut b = Batcher::default();
        let a = b.request_chunk(4, 6).unwrap();
        b.begin_frame();
        b.commit(BatchKey::default(), &a);
        b.append_indices(&a, &QUAD);
        b.end_frame();
        b.begin_frame();
        assert_eq!(b.buffer(0).unwrap().index_offset(), 0);
        assert!(b.batches().is_empty());
    }
}
