use super::FLOAT_STRIDE;

/// A renderable's sub-region of a [`MeshBuffer`].
///
/// Plain indices, no borrow: the buffer may grow (reallocate) while chunks
/// are alive.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Chunk {
    pub buffer_id: u16,
    pub vertex_offset: u32,
    pub vertex_count: u32,
    pub index_count: u32,
}

impl Chunk {
    /// Float range of this chunk inside the owning buffer's `v_data`.
    #[inline]
    pub fn float_range(&self) -> std::ops::Range<usize> {
        let start = self.vertex_offset as usize * FLOAT_STRIDE;
        start..start + self.vertex_count as usize * FLOAT_STRIDE
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct FreeRange {
    start: u32,
    count: u32,
}

/// Growable interleaved vertex store plus the index stream built each frame.
///
/// Vertex space is handed out first-fit from a free list, then from the
/// high-water cursor. Released ranges are merged with their neighbours and
/// given back to the cursor when they sit at the end.
///
/// Performance characteristics:
/// - backing arrays only grow; steady-state frames do not allocate
/// - `index_offset` is reset once per frame by the batcher
#[derive(Debug)]
pub struct MeshBuffer {
    id: u16,
    max_vertices: u32,
    v_data: Vec<f32>,
    i_data: Vec<u16>,
    vertex_cursor: u32,
    free: Vec<FreeRange>,
    reserved_indices: usize,
    index_offset: usize,
}

impl MeshBuffer {
    pub fn new(id: u16, initial_vertices: u32, max_vertices: u32) -> Self {
        let initial = initial_vertices.min(max_vertices) as usize;
        Self {
            id,
            max_vertices,
            v_data: vec![0.0; initial * FLOAT_STRIDE],
            i_data: Vec::with_capacity(initial * 3 / 2),
            vertex_cursor: 0,
            free: Vec::new(),
            reserved_indices: 0,
            index_offset: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Vertices handed out or sitting in the free list.
    #[inline]
    pub fn vertex_cursor(&self) -> u32 {
        self.vertex_cursor
    }

    /// Running write position in `i_data` for the current frame.
    #[inline]
    pub fn index_offset(&self) -> usize {
        self.index_offset
    }

    #[inline]
    pub fn v_data(&self) -> &[f32] {
        &self.v_data[..self.vertex_cursor as usize * FLOAT_STRIDE]
    }

    /// Indices written so far this frame.
    #[inline]
    pub fn i_data(&self) -> &[u16] {
        &self.i_data[..self.index_offset]
    }

    /// Tries to carve out `vertex_count` vertices. `None` when the buffer
    /// cannot address them.
    pub(crate) fn request(&mut self, vertex_count: u32, index_count: u32) -> Option<Chunk> {
        let vertex_offset = match self.take_free(vertex_count) {
            Some(start) => start,
            None => {
                let end = self.vertex_cursor.checked_add(vertex_count)?;
                if end > self.max_vertices {
                    return None;
                }
                let start = self.vertex_cursor;
                self.vertex_cursor = end;
                self.ensure_vertex_capacity(end);
                start
            }
        };

        self.reserved_indices += index_count as usize;
        if self.i_data.len() < self.reserved_indices {
            self.i_data.resize(self.reserved_indices, 0);
        }

        Some(Chunk { buffer_id: self.id, vertex_offset, vertex_count, index_count })
    }

    /// Returns a chunk's vertex range to the free list.
    pub(crate) fn release(&mut self, chunk: &Chunk) {
        debug_assert_eq!(chunk.buffer_id, self.id, "chunk released into the wrong buffer");
        self.reserved_indices = self.reserved_indices.saturating_sub(chunk.index_count as usize);
        if chunk.vertex_count == 0 {
            return;
        }

        let range = FreeRange { start: chunk.vertex_offset, count: chunk.vertex_count };
        let pos = self.free.partition_point(|r| r.start < range.start);
        self.free.insert(pos, range);
        self.merge_free_around(pos);

        // Give a trailing range back to the cursor.
        if let Some(last) = self.free.last().copied() {
            if last.start + last.count == self.vertex_cursor {
                self.vertex_cursor = last.start;
                self.free.pop();
            }
        }
    }

    pub(crate) fn vertices_mut(&mut self, chunk: &Chunk) -> &mut [f32] {
        &mut self.v_data[chunk.float_range()]
    }

    pub(crate) fn vertices(&self, chunk: &Chunk) -> &[f32] {
        &self.v_data[chunk.float_range()]
    }

    /// Appends `pattern` (chunk-local vertex indices) at the running offset,
    /// rebased onto the chunk's vertex offset.
    pub(crate) fn append_indices(&mut self, chunk: &Chunk, pattern: &[u16]) {
        let end = self.index_offset + pattern.len();
        if self.i_data.len() < end {
            // Only reachable when a chunk is filled twice in one frame.
            self.i_data.resize(end, 0);
        }
        let base = chunk.vertex_offset as u16;
        for (dst, &local) in self.i_data[self.index_offset..end].iter_mut().zip(pattern) {
            *dst = base.wrapping_add(local);
        }
        self.index_offset = end;
    }

    pub(crate) fn reset_index_offset(&mut self) {
        self.index_offset = 0;
    }

    fn take_free(&mut self, vertex_count: u32) -> Option<u32> {
        if vertex_count == 0 {
            return None;
        }
        let pos = self.free.iter().position(|r| r.count >= vertex_count)?;
        let range = &mut self.free[pos];
        let start = range.start;
        range.start += vertex_count;
        range.count -= vertex_count;
        if range.count == 0 {
            self.free.remove(pos);
        }
        Some(start)
    }

    fn merge_free_around(&mut self, pos: usize) {
        // merge with next
        if pos + 1 < self.free.len() {
            let cur = self.free[pos];
            let next = self.free[pos + 1];
            if cur.start + cur.count == next.start {
                self.free[pos].count += next.count;
                self.free.remove(pos + 1);
            }
        }
        // merge with previous
        if pos > 0 {
            let prev = self.free[pos - 1];
            let cur = self.free[pos];
            if prev.start + prev.count == cur.start {
                self.free[pos - 1].count += cur.count;
                self.free.remove(pos);
            }
        }
    }

    fn ensure_vertex_capacity(&mut self, vertices: u32) {
        let needed = vertices as usize * FLOAT_STRIDE;
        if needed <= self.v_data.len() {
            return;
        }
        let grown = (vertices as usize)
            .next_power_of_two()
            .min(self.max_vertices as usize)
            .max(vertices as usize);
        log::debug!("mesh buffer {}: growing to {} vertices", self.id, grown);
        self.v_data.resize(grown * FLOAT_STRIDE, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> MeshBuffer {
        MeshBuffer::new(0, 4, 64)
    }

    // ── request ───────────────────────────────────────────────────────────

    #[test]
    fn sequential_requests_are_contiguous() {
        let mut mb = buffer();
        let a = mb.request(4, 6).unwrap();
        let b = mb.request(16, 54).unwrap();
        assert_eq!(a.vertex_offset, 0);
        assert_eq!(b.vertex_offset, 4);
        assert_eq!(mb.vertex_cursor(), 20);
    }

    #[test]
    fn growth_keeps_earlier_vertices() {
        let mut mb = buffer();
        let a = mb.request(4, 6).unwrap();
        mb.vertices_mut(&a)[0] = 42.0;
        let _b = mb.request(40, 60).unwrap();
        assert_eq!(mb.vertices(&a)[0], 42.0);
    }

    #[test]
    fn request_beyond_limit_fails() {
        let mut mb = buffer();
        assert!(mb.request(60, 0).is_some());
        assert!(mb.request(5, 0).is_none());
    }

    // ── release / free list ───────────────────────────────────────────────

    #[test]
    fn released_range_is_reused_first_fit() {
        let mut mb = buffer();
        let a = mb.request(4, 6).unwrap();
        let _b = mb.request(4, 6).unwrap();
        mb.release(&a);
        let c = mb.request(4, 6).unwrap();
        assert_eq!(c.vertex_offset, 0);
    }

    #[test]
    fn trailing_release_rewinds_cursor() {
        let mut mb = buffer();
        let a = mb.request(4, 6).unwrap();
        let b = mb.request(4, 6).unwrap();
        mb.release(&b);
        assert_eq!(mb.vertex_cursor(), 4);
        mb.release(&a);
        assert_eq!(mb.vertex_cursor(), 0);
    }

    #[test]
    fn adjacent_free_ranges_merge() {
        let mut mb = buffer();
        let a = mb.request(4, 0).unwrap();
        let b = mb.request(4, 0).unwrap();
        let _c = mb.request(4, 0).unwrap();
        mb.release(&a);
        mb.release(&b);
        // one 8-vertex hole at the front
        let big = mb.request(8, 0).unwrap();
        assert_eq!(big.vertex_offset, 0);
    }

    // ── indices ───────────────────────────────────────────────────────────

    #[test]
    fn append_rebases_and_advances() {
        let mut mb = buffer();
        let _a = mb.request(4, 6).unwrap();
        let b = mb.request(4, 6).unwrap();
        mb.append_indices(&b, &[0, 1, 2, 1, 3, 2]);
        assert_eq!(mb.i_data(), &[4, 5, 6, 5, 7, 6]);
        assert_eq!(mb.index_offset(), 6);
        mb.reset_index_offset();
        assert!(mb.i_data().is_empty());
    }
}
