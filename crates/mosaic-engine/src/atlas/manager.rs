use crate::sprite::SharedSpriteFrame;
use crate::texture::TextureId;

use super::{Atlas, AtlasPlacement, AtlasTexture};

/// Dynamic atlas policy.
#[derive(Debug, Clone)]
pub struct AtlasConfig {
    pub enabled: bool,

    /// Pages the manager may open before insertion gives up.
    pub max_atlas_count: usize,

    /// Square page edge in pixels.
    pub texture_size: u32,

    /// Textures larger than this in either dimension are never packed.
    pub max_frame_size: u32,

    /// Surround each copy with one-pixel duplicates so linear filtering
    /// does not sample the neighbour.
    pub texture_bleeding: bool,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_atlas_count: 5,
            texture_size: 2048,
            max_frame_size: 512,
            texture_bleeding: true,
        }
    }
}

/// Owns every atlas page and decides which frames get packed.
///
/// Pages are filled in order; a page that cannot take a texture is left
/// alone and the next one is opened.
#[derive(Debug)]
pub struct DynamicAtlasManager {
    config: AtlasConfig,
    atlases: Vec<Atlas>,
}

impl Default for DynamicAtlasManager {
    fn default() -> Self {
        Self::new(AtlasConfig::default())
    }
}

impl DynamicAtlasManager {
    pub fn new(config: AtlasConfig) -> Self {
        Self { config, atlases: Vec::new() }
    }

    #[inline]
    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Turning the manager off resets every page.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.config.enabled && !enabled {
            self.reset();
        }
        self.config.enabled = enabled;
    }

    #[inline]
    pub fn atlas_count(&self) -> usize {
        self.atlases.len()
    }

    pub fn atlases(&self) -> &[Atlas] {
        &self.atlases
    }

    /// Live page textures, for GPU upload.
    pub fn atlas_textures(&self) -> impl Iterator<Item = &AtlasTexture> {
        self.atlases.iter().filter_map(Atlas::texture)
    }

    /// Packs `frame` if it qualifies and redirects it to the atlas page.
    /// Returns whether the frame now lives in an atlas.
    pub fn pack_to_dynamic_atlas(&mut self, frame: &SharedSpriteFrame) -> bool {
        if !self.config.enabled {
            return false;
        }
        {
            let f = frame.borrow();
            if f.is_packed() {
                return true;
            }
            let tex = f.texture();
            if tex.width() == 0 || tex.height() == 0 {
                return false;
            }
        }

        match self.insert_sprite_frame(frame) {
            Some(placed) => {
                frame.borrow_mut().set_dynamic_atlas_frame(placed.texture, placed.x, placed.y);
                true
            }
            None => false,
        }
    }

    /// Inserts into the newest page, opening another when it is full.
    /// `None` is a soft failure: the frame keeps its own texture.
    pub fn insert_sprite_frame(&mut self, frame: &SharedSpriteFrame) -> Option<AtlasPlacement> {
        if !self.config.enabled || !self.qualifies(frame) {
            return None;
        }

        if let Some(atlas) = self.atlases.last_mut() {
            if let Some(placed) = atlas.insert_sprite_frame(frame) {
                return Some(placed);
            }
        }

        if self.atlases.len() >= self.config.max_atlas_count {
            log::debug!("dynamic atlas: all {} pages full", self.atlases.len());
            return None;
        }

        let size = self.config.texture_size;
        let mut atlas = Atlas::new(size, size, self.config.texture_bleeding);
        let placed = atlas.insert_sprite_frame(frame);
        log::debug!("dynamic atlas: opened page {}", self.atlases.len());
        self.atlases.push(atlas);
        placed
    }

    /// Drops `frame` from every page's dependents without unpacking it.
    pub fn remove_sprite_frame(&mut self, frame: &SharedSpriteFrame) {
        for atlas in &mut self.atlases {
            atlas.remove_sprite_frame(frame);
        }
    }

    /// Restores a packed frame and drops its texture from every page.
    pub fn delete_atlas_sprite_frame(&mut self, frame: &SharedSpriteFrame) {
        let source = {
            let f = frame.borrow();
            if !f.is_packed() {
                return;
            }
            f.source_texture().id()
        };

        self.remove_sprite_frame(frame);
        frame.borrow_mut().reset_dynamic_atlas_frame();
        self.delete_atlas_texture(source);
    }

    /// Evicts a source texture; pages left empty are destroyed.
    pub fn delete_atlas_texture(&mut self, texture: TextureId) {
        self.atlases.retain_mut(|atlas| {
            atlas.delete_inner_texture(texture);
            if atlas.is_empty() {
                atlas.destroy();
                false
            } else {
                true
            }
        });
    }

    /// Destroys every page, restoring all dependent frames.
    pub fn reset(&mut self) {
        for atlas in &mut self.atlases {
            atlas.destroy();
        }
        self.atlases.clear();
    }

    fn qualifies(&self, frame: &SharedSpriteFrame) -> bool {
        let f = frame.borrow();
        let tex = f.texture();
        !f.is_packed()
            && f.packable()
            && tex.packable()
            && tex.width() <= self.config.max_frame_size
            && tex.height() <= self.config.max_frame_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::SpriteFrame;
    use crate::texture::Texture2D;
    use image::RgbaImage;

    fn frame(w: u32, h: u32) -> SharedSpriteFrame {
        SpriteFrame::new(Texture2D::from_image(RgbaImage::new(w, h))).into_shared()
    }

    fn small_pages() -> DynamicAtlasManager {
        DynamicAtlasManager::new(AtlasConfig {
            max_atlas_count: 2,
            texture_size: 64,
            max_frame_size: 48,
            texture_bleeding: false,
            ..Default::default()
        })
    }

    // ── packing ───────────────────────────────────────────────────────────

    #[test]
    fn packing_redirects_frame() {
        let mut m = small_pages();
        let f = frame(10, 10);
        assert!(m.pack_to_dynamic_atlas(&f));
        let page = m.atlas_textures().next().unwrap().id();
        assert_eq!(f.borrow().texture().id(), page);
        assert_eq!(f.borrow().rect().x, 2.0);
    }

    #[test]
    fn packing_twice_is_stable() {
        let mut m = small_pages();
        let f = frame(10, 10);
        m.pack_to_dynamic_atlas(&f);
        let rect = f.borrow().rect();
        assert!(m.pack_to_dynamic_atlas(&f));
        assert_eq!(f.borrow().rect(), rect);
        assert_eq!(m.atlases()[0].count(), 1);
    }

    #[test]
    fn oversized_and_unpackable_frames_skipped() {
        let mut m = small_pages();
        assert!(!m.pack_to_dynamic_atlas(&frame(49, 10)));

        let f = frame(10, 10);
        f.borrow_mut().set_packable(false);
        assert!(!m.pack_to_dynamic_atlas(&f));
        assert_eq!(m.atlas_count(), 0);
    }

    #[test]
    fn disabled_manager_is_inert() {
        let mut m = small_pages();
        m.set_enabled(false);
        assert!(!m.pack_to_dynamic_atlas(&frame(10, 10)));
        assert_eq!(m.atlas_count(), 0);
    }

    #[test]
    fn overflow_opens_second_page() {
        let mut m = small_pages();
        let a = frame(40, 40);
        let b = frame(40, 40);
        assert!(m.pack_to_dynamic_atlas(&a));
        assert!(m.pack_to_dynamic_atlas(&b));
        assert_eq!(m.atlas_count(), 2);
        assert_ne!(a.borrow().texture().id(), b.borrow().texture().id());

        // both pages full, count capped
        assert!(!m.pack_to_dynamic_atlas(&frame(40, 40)));
        assert_eq!(m.atlas_count(), 2);
    }

    // ── deletion ──────────────────────────────────────────────────────────

    #[test]
    fn deleting_last_texture_destroys_page() {
        let mut m = small_pages();
        let f = frame(10, 10);
        let source = f.borrow().texture().id();
        m.pack_to_dynamic_atlas(&f);

        m.delete_atlas_sprite_frame(&f);
        assert_eq!(m.atlas_count(), 0);
        assert_eq!(f.borrow().texture().id(), source);
    }

    #[test]
    fn page_with_remaining_textures_survives() {
        let mut m = small_pages();
        let a = frame(10, 10);
        let b = frame(10, 10);
        m.pack_to_dynamic_atlas(&a);
        m.pack_to_dynamic_atlas(&b);

        m.delete_atlas_sprite_frame(&a);
        assert_eq!(m.atlas_count(), 1);
        assert!(b.borrow().is_packed());
    }

    #[test]
    fn reset_unpacks_everything() {
        let mut m = small_pages();
        let a = frame(10, 10);
        m.pack_to_dynamic_atlas(&a);
        m.reset();
        assert_eq!(m.atlas_count(), 0);
        assert!(!a.borrow().is_packed());
    }
}
