use std::f32::consts::TAU;

use crate::atlas::DynamicAtlasManager;
use crate::batch::{AllocError, AllocFailure, BatchKey, Batcher, MAX_VERTICES_PER_BUFFER, MaterialId};
use crate::coords::{Rgba8, Vec2};
use crate::node::TransformSource;
use crate::render_data::RenderData;

use super::{AssembleError, Assembler, GRAPHICS, fill_render_data};

const CIRCLE_SEGMENTS: usize = 32;

#[derive(Debug, Clone)]
enum PathKind {
    Fill,
    Stroke { width: f32 },
}

#[derive(Debug, Clone)]
struct Path {
    points: Vec<Vec2>,
    kind: PathKind,
    color: Rgba8,
}

#[derive(Debug, Copy, Clone)]
struct TessVertex {
    pos: Vec2,
    color: Rgba8,
}

/// Immediate-mode vector drawing component.
///
/// Fills are convex (fan triangulated); strokes are polylines made of one
/// quad per segment without joins. Everything is in node-local space.
#[derive(Debug)]
pub struct Graphics {
    paths: Vec<Path>,
    fill_color: Rgba8,
    stroke_color: Rgba8,
    line_width: f32,
    material: MaterialId,

    pub(crate) render_data: RenderData,
    pub(crate) transform_version: Option<u32>,

    vertices: Vec<TessVertex>,
    indices: Vec<u16>,
    geometry_dirty: bool,
    color_dirty: bool,
    last_opacity: f32,
}

impl Default for Graphics {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            fill_color: Rgba8::WHITE,
            stroke_color: Rgba8::new(0, 0, 0, 255),
            line_width: 1.0,
            material: MaterialId::default(),
            render_data: RenderData::new(),
            transform_version: None,
            vertices: Vec::new(),
            indices: Vec::new(),
            geometry_dirty: true,
            color_dirty: true,
            last_opacity: 1.0,
        }
    }
}

impl Graphics {
    pub fn new() -> Self {
        Self::default()
    }

    // ── paint state ───────────────────────────────────────────────────────

    pub fn set_fill_color(&mut self, color: Rgba8) {
        self.fill_color = color;
    }

    pub fn set_stroke_color(&mut self, color: Rgba8) {
        self.stroke_color = color;
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.line_width = width.max(0.0);
    }

    pub fn set_material(&mut self, material: MaterialId) {
        self.material = material;
    }

    #[inline]
    pub fn render_data(&self) -> &RenderData {
        &self.render_data
    }

    // ── paths ─────────────────────────────────────────────────────────────

    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let points = vec![
            Vec2::new(x, y),
            Vec2::new(x + w, y),
            Vec2::new(x + w, y + h),
            Vec2::new(x, y + h),
        ];
        self.push_fill(points);
    }

    pub fn circle(&mut self, cx: f32, cy: f32, radius: f32) {
        let points = (0..CIRCLE_SEGMENTS)
            .map(|i| {
                let a = TAU * i as f32 / CIRCLE_SEGMENTS as f32;
                Vec2::new(cx + radius * a.cos(), cy + radius * a.sin())
            })
            .collect();
        self.push_fill(points);
    }

    /// Convex polygon. Concave input renders, but with overlapping triangles.
    pub fn polygon(&mut self, points: &[Vec2]) {
        self.push_fill(points.to_vec());
    }

    /// Polyline stroked with the current line width and stroke color.
    pub fn stroke(&mut self, points: &[Vec2]) {
        if points.len() < 2 || self.line_width == 0.0 {
            return;
        }
        self.paths.push(Path {
            points: points.to_vec(),
            kind: PathKind::Stroke { width: self.line_width },
            color: self.stroke_color,
        });
        self.geometry_dirty = true;
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.geometry_dirty = true;
    }

    fn push_fill(&mut self, points: Vec<Vec2>) {
        if points.len() < 3 {
            return;
        }
        self.paths.push(Path { points, kind: PathKind::Fill, color: self.fill_color });
        self.geometry_dirty = true;
    }

    // ── rendering ─────────────────────────────────────────────────────────

    pub fn assembler(&self) -> &'static dyn Assembler<Component = Graphics> {
        &GRAPHICS
    }

    pub fn batch_key(&self) -> BatchKey {
        BatchKey::new(self.material, None)
    }

    pub fn update(&mut self, node: &dyn TransformSource, batcher: &mut Batcher) -> Result<(), AssembleError> {
        let assembler = self.assembler();
        assembler.update_render_data(self, node, batcher, None)?;

        let opacity = node.opacity();
        if self.color_dirty || self.last_opacity != opacity {
            assembler.update_color(self, node, batcher);
            self.color_dirty = false;
            self.last_opacity = opacity;
        }
        Ok(())
    }

    pub fn fill(&mut self, node: &dyn TransformSource, batcher: &mut Batcher) {
        let Some(chunk) = self.render_data.chunk().copied() else { return };
        batcher.commit(self.batch_key(), &chunk);
        self.assembler().fill_buffers(self, node, batcher);
    }

    pub fn destroy(&mut self, batcher: &mut Batcher) {
        self.render_data.release(batcher);
    }

    /// Rebuilds the scratch vertex/index lists from the recorded paths.
    ///
    /// Fails once the paths need more vertices than one mesh buffer can
    /// address with u16 indices; the scratch lists are left empty.
    fn tessellate(&mut self) -> Result<(), AllocError> {
        self.vertices.clear();
        self.indices.clear();

        for path in &self.paths {
            let (vc, ic) = match path.kind {
                PathKind::Fill => (path.points.len(), (path.points.len() - 2) * 3),
                PathKind::Stroke { .. } => {
                    let segments = path.points.len() - 1;
                    (segments * 4, segments * 6)
                }
            };
            let vertex_count = self.vertices.len() + vc;
            if vertex_count > MAX_VERTICES_PER_BUFFER as usize {
                let err = AllocError {
                    vertex_count: u32::try_from(vertex_count).unwrap_or(u32::MAX),
                    index_count: u32::try_from(self.indices.len() + ic).unwrap_or(u32::MAX),
                    reason: AllocFailure::ExceedsBufferLimit,
                };
                self.vertices.clear();
                self.indices.clear();
                return Err(err);
            }

            let base = self.vertices.len() as u16;
            match path.kind {
                PathKind::Fill => {
                    self.vertices.extend(path.points.iter().map(|&pos| TessVertex { pos, color: path.color }));
                    for i in 1..path.points.len() as u16 - 1 {
                        self.indices.extend_from_slice(&[base, base + i, base + i + 1]);
                    }
                }
                PathKind::Stroke { width } => {
                    let half = width * 0.5;
                    for (k, seg) in path.points.windows(2).enumerate() {
                        let (a, b) = (seg[0], seg[1]);
                        let n = (b - a).normalized().perp() * half;
                        let q = base + 4 * k as u16;
                        for pos in [a - n, b - n, a + n, b + n] {
                            self.vertices.push(TessVertex { pos, color: path.color });
                        }
                        self.indices.extend_from_slice(&[q, q + 1, q + 2, q + 1, q + 3, q + 2]);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Assembler for [`Graphics`]: variable topology, rebuilt when paths change.
#[derive(Debug, Copy, Clone, Default)]
pub struct GraphicsAssembler;

impl Assembler for GraphicsAssembler {
    type Component = Graphics;

    /// Sizes the chunk to the current tessellation. An empty drawing holds
    /// no chunk at all.
    fn create_data(&self, g: &mut Graphics, batcher: &mut Batcher) -> Result<(), AssembleError> {
        let (vc, ic) = (g.vertices.len() as u32, g.indices.len() as u32);
        if vc == 0 {
            g.render_data.release(batcher);
            return Ok(());
        }
        g.render_data.allocate(batcher, vc, ic)?;
        g.render_data.write_index_buffer(&g.indices);
        Ok(())
    }

    fn update_render_data(
        &self,
        g: &mut Graphics,
        node: &dyn TransformSource,
        batcher: &mut Batcher,
        _atlas: Option<&mut DynamicAtlasManager>,
    ) -> Result<(), AssembleError> {
        if !g.geometry_dirty {
            return Ok(());
        }
        if let Err(err) = g.tessellate() {
            log::warn!("graphics: {err}");
            g.render_data.release(batcher);
            return Err(err.into());
        }
        self.create_data(g, batcher)?;
        self.update_uvs(g, batcher)?;
        self.update_vertex_data(g, node)?;
        g.geometry_dirty = false;
        g.color_dirty = true;
        Ok(())
    }

    fn update_uvs(&self, g: &mut Graphics, batcher: &mut Batcher) -> Result<(), AssembleError> {
        let zeros = vec![[0.0f32; 2]; g.render_data.data_length()];
        g.render_data.write_uvs(batcher, &zeros);
        Ok(())
    }

    fn update_vertex_data(&self, g: &mut Graphics, _node: &dyn TransformSource) -> Result<(), AssembleError> {
        for (dst, src) in g.render_data.data_mut().iter_mut().zip(&g.vertices) {
            dst.x = src.pos.x;
            dst.y = src.pos.y;
            dst.z = 0.0;
        }
        g.render_data.set_vertex_dirty();
        Ok(())
    }

    fn fill_buffers(&self, g: &mut Graphics, node: &dyn TransformSource, batcher: &mut Batcher) {
        fill_render_data(&mut g.render_data, &mut g.transform_version, node, batcher);
    }

    /// Paint alpha times node opacity.
    fn update_color(&self, g: &mut Graphics, node: &dyn TransformSource, batcher: &mut Batcher) {
        let opacity = node.opacity();
        for (dst, src) in g.render_data.data_mut().iter_mut().zip(&g.vertices) {
            let c = src.color.to_linear();
            dst.color = src.color.to_linear_with_alpha(c.a * opacity);
        }
        g.render_data.upload_colors(batcher);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::UiNode;

    // ── tessellation ──────────────────────────────────────────────────────

    #[test]
    fn rect_is_two_fan_triangles() {
        let mut batcher = Batcher::default();
        let mut g = Graphics::new();
        g.rect(0.0, 0.0, 10.0, 10.0);
        g.update(&UiNode::default(), &mut batcher).unwrap();
        assert_eq!(g.render_data().data_length(), 4);
        assert_eq!(g.render_data().index_pattern(), &[0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn stroke_emits_quad_per_segment() {
        let mut batcher = Batcher::default();
        let mut g = Graphics::new();
        g.set_line_width(2.0);
        g.stroke(&[Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0)]);
        g.update(&UiNode::default(), &mut batcher).unwrap();

        let d = g.render_data().data();
        assert_eq!(d.len(), 8);
        assert_eq!(g.render_data().index_pattern().len(), 12);
        // first segment runs along +X, offset one unit either side
        assert_eq!((d[0].y, d[2].y), (-1.0, 1.0));
    }

    #[test]
    fn degenerate_paths_are_ignored() {
        let mut g = Graphics::new();
        g.polygon(&[Vec2::zero(), Vec2::new(1.0, 0.0)]);
        g.stroke(&[Vec2::zero()]);
        let mut batcher = Batcher::default();
        g.update(&UiNode::default(), &mut batcher).unwrap();
        assert!(!g.render_data().is_allocated());
    }

    #[test]
    fn oversized_drawing_fails_instead_of_wrapping_indices() {
        let mut batcher = Batcher::default();
        let node = UiNode::default();
        let mut g = Graphics::new();
        for i in 0..16382 {
            g.rect(i as f32, 0.0, 1.0, 1.0);
        }
        g.update(&node, &mut batcher).unwrap();
        assert_eq!(g.render_data().data_length(), 16382 * 4);

        g.circle(0.0, 0.0, 5.0);
        let err = g.update(&node, &mut batcher).unwrap_err();
        assert_eq!(err.code(), 9100);
        match err {
            AssembleError::Alloc(alloc) => {
                assert_eq!(alloc.reason, AllocFailure::ExceedsBufferLimit);
                assert_eq!(alloc.vertex_count as usize, 16382 * 4 + CIRCLE_SEGMENTS);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!g.render_data().is_allocated());

        g.clear();
        g.rect(0.0, 0.0, 1.0, 1.0);
        g.update(&node, &mut batcher).unwrap();
        assert_eq!(g.render_data().data_length(), 4);
    }

    // ── topology changes ──────────────────────────────────────────────────

    #[test]
    fn adding_paths_reallocates() {
        let mut batcher = Batcher::default();
        let node = UiNode::default();
        let mut g = Graphics::new();
        g.rect(0.0, 0.0, 10.0, 10.0);
        g.update(&node, &mut batcher).unwrap();

        g.circle(0.0, 0.0, 5.0);
        g.update(&node, &mut batcher).unwrap();
        assert_eq!(g.render_data().data_length(), 4 + CIRCLE_SEGMENTS);
        assert_eq!(g.render_data().index_pattern().len(), 6 + 3 * (CIRCLE_SEGMENTS - 2));

        g.clear();
        g.update(&node, &mut batcher).unwrap();
        assert!(!g.render_data().is_allocated());
        assert_eq!(batcher.buffer(0).unwrap().vertex_cursor(), 0);
    }

    // ── color / batching ──────────────────────────────────────────────────

    #[test]
    fn color_alpha_multiplies_opacity() {
        let mut batcher = Batcher::default();
        let mut node = UiNode::default();
        node.set_opacity(0.5);
        let mut g = Graphics::new();
        g.set_fill_color(Rgba8::new(255, 255, 255, 51));
        g.rect(0.0, 0.0, 1.0, 1.0);
        g.update(&node, &mut batcher).unwrap();
        assert_eq!(g.render_data().data()[0].color.a, 0.2 * 0.5);
    }

    #[test]
    fn graphics_batch_without_texture() {
        let mut batcher = Batcher::default();
        let node = UiNode::default();
        let mut g = Graphics::new();
        g.rect(0.0, 0.0, 1.0, 1.0);
        g.update(&node, &mut batcher).unwrap();

        batcher.begin_frame();
        g.fill(&node, &mut batcher);
        let batches = batcher.end_frame();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].key.texture, None);
        assert_eq!(batches[0].index_count, 6);
    }
}
