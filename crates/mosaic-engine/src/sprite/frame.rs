use std::cell::RefCell;
use std::rc::Rc;

use crate::coords::{Rect, Size, Vec2};
use crate::texture::Texture2D;

/// Sprite frames are shared between sprites and referenced weakly by atlases.
pub type SharedSpriteFrame = Rc<RefCell<SpriteFrame>>;

/// 9-slice cap sizes in frame pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Insets {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Insets {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self { left, top, right, bottom }
    }
}

/// How far the trimmed rect sits inside the untrimmed original, per side.
///
/// `left`/`bottom` are positive insets, `right`/`top` are negative: adding
/// them to the far edge of the untrimmed quad moves it inward.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct TrimmedBorder {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

/// Where a frame lived before the dynamic atlas absorbed it.
#[derive(Debug, Clone)]
pub struct OriginalFrame {
    pub texture: Texture2D,
    pub x: f32,
    pub y: f32,
}

/// A rectangular region of a texture plus everything assemblers need to map
/// it onto geometry.
///
/// `rect` is in texture pixels with a top-left origin and describes the
/// frame unrotated; a rotated frame occupies `rect.height × rect.width` in
/// the texture.
#[derive(Debug, Clone)]
pub struct SpriteFrame {
    texture: Texture2D,
    rect: Rect,
    rotated: bool,
    offset: Vec2,
    original_size: Size,
    insets: Insets,
    packable: bool,
    original: Option<OriginalFrame>,
    uv: [f32; 8],
    uv_sliced: [[f32; 2]; 16],
    version: u32,
}

impl SpriteFrame {
    /// Frame covering the whole texture.
    pub fn new(texture: Texture2D) -> Self {
        let rect = Rect::new(0.0, 0.0, texture.width() as f32, texture.height() as f32);
        Self::with_rect(texture, rect, false)
    }

    /// Untrimmed sub-rect of a sheet.
    pub fn with_rect(texture: Texture2D, rect: Rect, rotated: bool) -> Self {
        let mut frame = Self {
            texture,
            rect,
            rotated,
            offset: Vec2::zero(),
            original_size: Size::new(rect.width, rect.height),
            insets: Insets::default(),
            packable: true,
            original: None,
            uv: [0.0; 8],
            uv_sliced: [[0.0; 2]; 16],
            version: 0,
        };
        frame.calculate_uvs();
        frame
    }

    /// Trimmed frame: `offset` is the trimmed rect's center relative to the
    /// untrimmed one, `original_size` the untrimmed size.
    pub fn trimmed(texture: Texture2D, rect: Rect, rotated: bool, offset: Vec2, original_size: Size) -> Self {
        let mut frame = Self::with_rect(texture, rect, rotated);
        frame.offset = offset;
        frame.original_size = original_size;
        frame
    }

    pub fn into_shared(self) -> SharedSpriteFrame {
        Rc::new(RefCell::new(self))
    }

    // ── accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn texture(&self) -> &Texture2D {
        &self.texture
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    #[inline]
    pub fn rotated(&self) -> bool {
        self.rotated
    }

    #[inline]
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    #[inline]
    pub fn original_size(&self) -> Size {
        self.original_size
    }

    #[inline]
    pub fn insets(&self) -> Insets {
        self.insets
    }

    /// Corner UVs in vertex order: left-bottom, right-bottom, left-top, right-top.
    #[inline]
    pub fn uv(&self) -> &[f32; 8] {
        &self.uv
    }

    /// 4×4 grid of UVs, row-major from the bottom row.
    #[inline]
    pub fn uv_sliced(&self) -> &[[f32; 2]; 16] {
        &self.uv_sliced
    }

    /// Bumped whenever texture, rect or insets change.
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[inline]
    pub fn original(&self) -> Option<&OriginalFrame> {
        self.original.as_ref()
    }

    /// True while the frame points into a dynamic atlas.
    #[inline]
    pub fn is_packed(&self) -> bool {
        self.original.is_some()
    }

    /// The texture this frame was authored against, atlas or not.
    pub fn source_texture(&self) -> &Texture2D {
        self.original.as_ref().map_or(&self.texture, |o| &o.texture)
    }

    #[inline]
    pub fn packable(&self) -> bool {
        self.packable
    }

    pub fn set_packable(&mut self, packable: bool) {
        self.packable = packable;
    }

    pub fn set_insets(&mut self, insets: Insets) {
        self.insets = insets;
        self.calculate_sliced_uv();
        self.bump();
    }

    pub fn trimmed_border(&self) -> TrimmedBorder {
        let dw = (self.original_size.width - self.rect.width) / 2.0;
        let dh = (self.original_size.height - self.rect.height) / 2.0;
        TrimmedBorder {
            left: self.offset.x + dw,
            right: self.offset.x - dw,
            bottom: self.offset.y + dh,
            top: self.offset.y - dh,
        }
    }

    // ── dynamic atlas ─────────────────────────────────────────────────────

    /// Redirects the frame into an atlas page at pixel `(x, y)`.
    ///
    /// Remembers the first original only; repacking keeps pointing back at
    /// the authored texture.
    pub fn set_dynamic_atlas_frame(&mut self, atlas_texture: Texture2D, x: f32, y: f32) {
        if self.original.is_none() {
            self.original = Some(OriginalFrame {
                texture: self.texture.clone(),
                x: self.rect.x,
                y: self.rect.y,
            });
        }
        self.texture = atlas_texture;
        self.rect.x = x;
        self.rect.y = y;
        self.calculate_uvs();
        self.bump();
    }

    /// Restores the unatlased texture, rect origin and UVs.
    pub fn reset_dynamic_atlas_frame(&mut self) {
        let Some(original) = self.original.take() else { return };
        self.rect.x = original.x;
        self.rect.y = original.y;
        self.texture = original.texture;
        self.calculate_uvs();
        self.bump();
    }

    // ── uv tables ─────────────────────────────────────────────────────────

    fn bump(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    fn calculate_uvs(&mut self) {
        self.calculate_uv();
        self.calculate_sliced_uv();
    }

    fn calculate_uv(&mut self) {
        let tw = self.texture.width().max(1) as f32;
        let th = self.texture.height().max(1) as f32;
        let r = self.rect;

        self.uv = if self.rotated {
            let l = r.x / tw;
            let right = (r.x + r.height) / tw;
            let b = (r.y + r.width) / th;
            let t = r.y / th;
            [l, t, l, b, right, t, right, b]
        } else {
            let l = r.x / tw;
            let right = (r.x + r.width) / tw;
            let b = (r.y + r.height) / th;
            let t = r.y / th;
            [l, b, right, b, l, t, right, t]
        };
    }

    fn calculate_sliced_uv(&mut self) {
        let tw = self.texture.width().max(1) as f32;
        let th = self.texture.height().max(1) as f32;
        let r = self.rect;
        let Insets { left, top, right, bottom } = self.insets;
        let center_w = r.width - left - right;
        let center_h = r.height - top - bottom;

        let mut u = [0.0f32; 4];
        let mut v = [0.0f32; 4];

        if self.rotated {
            u[0] = r.x / tw;
            u[1] = (r.x + bottom) / tw;
            u[2] = (r.x + bottom + center_h) / tw;
            u[3] = (r.x + r.height) / tw;
            v[3] = r.y / th;
            v[2] = (r.y + left) / th;
            v[1] = (r.y + left + center_w) / th;
            v[0] = (r.y + r.width) / th;

            for row in 0..4 {
                for col in 0..4 {
                    self.uv_sliced[row * 4 + col] = [u[row], v[3 - col]];
                }
            }
        } else {
            u[0] = r.x / tw;
            u[1] = (r.x + left) / tw;
            u[2] = (r.x + left + center_w) / tw;
            u[3] = (r.x + r.width) / tw;
            v[3] = r.y / th;
            v[2] = (r.y + top) / th;
            v[1] = (r.y + top + center_h) / th;
            v[0] = (r.y + r.height) / th;

            for row in 0..4 {
                for col in 0..4 {
                    self.uv_sliced[row * 4 + col] = [u[col], v[row]];
                }
            }
        }
    }
}
