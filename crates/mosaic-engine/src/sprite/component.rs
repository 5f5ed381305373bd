use crate::assembler::{AssembleError, Assembler, BAR_FILLED, SIMPLE, SLICED};
use crate::atlas::DynamicAtlasManager;
use crate::batch::{BatchKey, Batcher, MaterialId};
use crate::coords::{Rgba8, Size, Vec2};
use crate::node::TransformSource;
use crate::render_data::RenderData;

use super::SharedSpriteFrame;

/// Geometry strategy for a [`Sprite`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum SpriteType {
    #[default]
    Simple,
    Sliced,
    Filled,
}

/// Fill direction for [`SpriteType::Filled`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum FillType {
    #[default]
    Horizontal,
    Vertical,
    /// Accepted as configuration; bar filling cannot render it.
    Radial,
}

/// Textured quad-ish renderable.
///
/// Holds its assembler choice as a [`SpriteType`] and its vertex state as a
/// [`RenderData`]. The node is passed in per call and never stored.
#[derive(Debug)]
pub struct Sprite {
    frame: Option<SharedSpriteFrame>,
    sprite_type: SpriteType,
    fill_type: FillType,
    fill_start: f32,
    fill_range: f32,
    color: Rgba8,
    trim: bool,
    material: MaterialId,

    pub(crate) render_data: RenderData,
    pub(crate) transform_version: Option<u32>,

    frame_version: Option<u32>,
    built_for: Option<SpriteType>,
    color_dirty: bool,
    last_opacity: f32,
    last_layout: Option<(Size, Vec2)>,
}

impl Default for Sprite {
    fn default() -> Self {
        Self {
            frame: None,
            sprite_type: SpriteType::Simple,
            fill_type: FillType::Horizontal,
            fill_start: 0.0,
            fill_range: 1.0,
            color: Rgba8::WHITE,
            trim: true,
            material: MaterialId::default(),
            render_data: RenderData::new(),
            transform_version: None,
            frame_version: None,
            built_for: None,
            color_dirty: true,
            last_opacity: 1.0,
            last_layout: None,
        }
    }
}

impl Sprite {
    pub fn new(frame: SharedSpriteFrame) -> Self {
        Self { frame: Some(frame), ..Self::default() }
    }

    // ── properties ────────────────────────────────────────────────────────

    #[inline]
    pub fn sprite_frame(&self) -> Option<&SharedSpriteFrame> {
        self.frame.as_ref()
    }

    pub fn set_sprite_frame(&mut self, frame: Option<SharedSpriteFrame>) {
        self.frame = frame;
        self.frame_version = None;
        self.render_data.set_vertex_dirty();
    }

    #[inline]
    pub fn sprite_type(&self) -> SpriteType {
        self.sprite_type
    }

    /// Takes effect at the next update, which rebuilds the render data.
    pub fn set_type(&mut self, sprite_type: SpriteType) {
        if self.sprite_type != sprite_type {
            self.sprite_type = sprite_type;
            self.render_data.set_vertex_dirty();
        }
    }

    #[inline]
    pub fn fill_type(&self) -> FillType {
        self.fill_type
    }

    pub fn set_fill_type(&mut self, fill_type: FillType) {
        self.fill_type = fill_type;
        self.render_data.set_vertex_dirty();
    }

    #[inline]
    pub fn fill_start(&self) -> f32 {
        self.fill_start
    }

    pub fn set_fill_start(&mut self, start: f32) {
        self.fill_start = start;
        self.render_data.set_vertex_dirty();
    }

    #[inline]
    pub fn fill_range(&self) -> f32 {
        self.fill_range
    }

    /// Negative ranges fill backward from `fill_start`.
    pub fn set_fill_range(&mut self, range: f32) {
        self.fill_range = range;
        self.render_data.set_vertex_dirty();
    }

    #[inline]
    pub fn color(&self) -> Rgba8 {
        self.color
    }

    pub fn set_color(&mut self, color: Rgba8) {
        if self.color != color {
            self.color = color;
            self.color_dirty = true;
        }
    }

    /// `true` stretches the trimmed rect over the whole content size.
    #[inline]
    pub fn trim(&self) -> bool {
        self.trim
    }

    pub fn set_trim(&mut self, trim: bool) {
        self.trim = trim;
        self.render_data.set_vertex_dirty();
    }

    #[inline]
    pub fn material(&self) -> MaterialId {
        self.material
    }

    pub fn set_material(&mut self, material: MaterialId) {
        self.material = material;
    }

    #[inline]
    pub fn render_data(&self) -> &RenderData {
        &self.render_data
    }

    // ── rendering ─────────────────────────────────────────────────────────

    pub fn assembler(&self) -> &'static dyn Assembler<Component = Sprite> {
        match self.sprite_type {
            SpriteType::Simple => &SIMPLE,
            SpriteType::Sliced => &SLICED,
            SpriteType::Filled => &BAR_FILLED,
        }
    }

    /// Material plus the texture the frame currently samples.
    pub fn batch_key(&self) -> BatchKey {
        let texture = self.frame.as_ref().map(|f| f.borrow().texture().id());
        BatchKey::new(self.material, texture)
    }

    /// Per-frame geometry pass: (re)creates render data when the type
    /// changed, refreshes dirty local geometry and UVs, then colors.
    pub fn update(
        &mut self,
        node: &dyn TransformSource,
        batcher: &mut Batcher,
        atlas: Option<&mut DynamicAtlasManager>,
    ) -> Result<(), AssembleError> {
        let assembler = self.assembler();

        if self.built_for != Some(self.sprite_type) {
            assembler.create_data(self, batcher)?;
            self.built_for = Some(self.sprite_type);
            self.color_dirty = true;
        }

        let layout = (node.content_size(), node.anchor());
        if self.last_layout != Some(layout) {
            self.last_layout = Some(layout);
            self.render_data.set_vertex_dirty();
        }

        self.sync_frame_version();
        assembler.update_render_data(self, node, batcher, atlas)?;
        // packing during the pass moves the frame into an atlas page
        if self.sync_frame_version() {
            assembler.update_render_data(self, node, batcher, None)?;
        }

        let opacity = node.opacity();
        if self.color_dirty || self.last_opacity != opacity {
            assembler.update_color(self, node, batcher);
            self.color_dirty = false;
            self.last_opacity = opacity;
        }
        Ok(())
    }

    /// Marks the vertices dirty when the shared frame changed since the last
    /// look (atlas redirect or restore, new insets). Returns whether it did.
    fn sync_frame_version(&mut self) -> bool {
        let version = self.frame.as_ref().map(|f| f.borrow().version());
        if version == self.frame_version {
            return false;
        }
        self.frame_version = version;
        self.render_data.set_vertex_dirty();
        true
    }

    /// Opens or extends the draw batch for this sprite and writes its
    /// vertices and indices.
    pub fn fill(&mut self, node: &dyn TransformSource, batcher: &mut Batcher) {
        let Some(chunk) = self.render_data.chunk().copied() else { return };
        batcher.commit(self.batch_key(), &chunk);
        self.assembler().fill_buffers(self, node, batcher);
    }

    /// Gives the chunk back and drops any atlas dependency.
    pub fn destroy(&mut self, batcher: &mut Batcher, atlas: Option<&mut DynamicAtlasManager>) {
        self.render_data.release(batcher);
        self.built_for = None;
        if let (Some(frame), Some(atlas)) = (&self.frame, atlas) {
            atlas.remove_sprite_frame(frame);
        }
    }
}
