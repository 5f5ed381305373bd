use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::cell::RefCell;

use crate::sprite::{SharedSpriteFrame, SpriteFrame};
use crate::texture::{Texture2D, TextureId};

use super::AtlasTexture;

/// Padding between packed textures and around the page edge.
pub const SPACE: u32 = 2;

/// Frames at or below this size in either dimension get diagonal bleed copies too.
const SMALL_FRAME: u32 = 8;

/// Where a frame landed: pixel origin of its rect inside the page.
#[derive(Debug, Clone)]
pub struct AtlasPlacement {
    pub x: f32,
    pub y: f32,
    pub texture: Texture2D,
}

#[derive(Debug, Copy, Clone)]
struct InnerTexture {
    x: u32,
    y: u32,
}

/// One shelf-packed atlas page.
///
/// Whole source textures are copied in left to right; when a texture does
/// not fit the remaining row width the cursor drops to the tallest extent
/// of the row so far. Placements never move until [`reset`](Self::reset).
#[derive(Debug)]
pub struct Atlas {
    texture: Option<AtlasTexture>,
    width: u32,
    height: u32,
    x: u32,
    y: u32,
    next_y: u32,
    bleeding: bool,
    inner_textures: HashMap<TextureId, InnerTexture>,
    frames: Vec<Weak<RefCell<SpriteFrame>>>,
    count: usize,
}

impl Atlas {
    pub fn new(width: u32, height: u32, bleeding: bool) -> Self {
        Self {
            texture: Some(AtlasTexture::new(width, height)),
            width,
            height,
            x: SPACE,
            y: SPACE,
            next_y: SPACE,
            bleeding,
            inner_textures: HashMap::new(),
            frames: Vec::new(),
            count: 0,
        }
    }

    #[inline]
    pub fn texture(&self) -> Option<&AtlasTexture> {
        self.texture.as_ref()
    }

    /// Source textures currently resident.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn contains(&self, texture: TextureId) -> bool {
        self.inner_textures.contains_key(&texture)
    }

    /// Frames currently relying on this page.
    pub fn dependent_frames(&self) -> usize {
        self.frames.iter().filter(|f| f.strong_count() > 0).count()
    }

    /// Places the frame's texture (once per texture) and returns the frame
    /// rect's new origin. `None` when the page is full or destroyed, when
    /// the texture is wider than a padded row, or when it has no CPU pixels.
    pub fn insert_sprite_frame(&mut self, frame: &SharedSpriteFrame) -> Option<AtlasPlacement> {
        let page = self.texture.as_mut()?;
        let f = frame.borrow();
        let rect = f.rect();
        let source = f.texture();

        let (ox, oy) = match self.inner_textures.get(&source.id()) {
            Some(info) => (info.x, info.y),
            None => {
                let image = source.image()?;
                let (w, h) = (source.width(), source.height());
                if w + 2 * SPACE > self.width {
                    log::trace!("atlas {:?}: {w}px texture wider than a row", page.id());
                    return None;
                }

                if self.x + w + SPACE > self.width {
                    self.x = SPACE;
                    self.y = self.next_y;
                }
                if self.y + h + SPACE > self.next_y {
                    self.next_y = self.y + h + SPACE;
                }
                if self.next_y > self.height {
                    log::trace!("atlas {:?}: full at {w}x{h}", page.id());
                    return None;
                }

                let (x, y) = (self.x as i64, self.y as i64);
                if self.bleeding {
                    if w <= SMALL_FRAME || h <= SMALL_FRAME {
                        page.draw_texture_at(image, x - 1, y - 1);
                        page.draw_texture_at(image, x - 1, y + 1);
                        page.draw_texture_at(image, x + 1, y - 1);
                        page.draw_texture_at(image, x + 1, y + 1);
                    }
                    page.draw_texture_at(image, x - 1, y);
                    page.draw_texture_at(image, x + 1, y);
                    page.draw_texture_at(image, x, y - 1);
                    page.draw_texture_at(image, x, y + 1);
                }
                page.draw_texture_at(image, x, y);

                let placed = InnerTexture { x: self.x, y: self.y };
                self.inner_textures.insert(source.id(), placed);
                self.count += 1;
                self.x += w + SPACE;
                (placed.x, placed.y)
            }
        };

        let placement = AtlasPlacement {
            x: rect.x + ox as f32,
            y: rect.y + oy as f32,
            texture: page.descriptor(),
        };
        drop(f);
        self.frames.push(Rc::downgrade(frame));
        Some(placement)
    }

    /// Forgets that `frame` depends on this page. Pixels stay.
    pub fn remove_sprite_frame(&mut self, frame: &SharedSpriteFrame) {
        let target = Rc::downgrade(frame);
        if let Some(pos) = self.frames.iter().position(|f| f.ptr_eq(&target)) {
            self.frames.swap_remove(pos);
        }
    }

    /// Evicts a source texture's placement. The space is not reclaimed
    /// before the next reset.
    pub fn delete_inner_texture(&mut self, texture: TextureId) {
        if self.inner_textures.remove(&texture).is_some() {
            self.count -= 1;
        }
    }

    /// Rewinds the packing cursor and points every live dependent frame back
    /// at its own texture.
    pub fn reset(&mut self) {
        self.x = SPACE;
        self.y = SPACE;
        self.next_y = SPACE;

        for frame in self.frames.drain(..) {
            // Dropped frames have nothing to restore.
            let Some(frame) = frame.upgrade() else { continue };
            frame.borrow_mut().reset_dynamic_atlas_frame();
        }
        self.inner_textures.clear();
        self.count = 0;
    }

    /// Reset plus release of the page pixels. Further insertions fail.
    pub fn destroy(&mut self) {
        self.reset();
        self.texture = None;
    }
}
