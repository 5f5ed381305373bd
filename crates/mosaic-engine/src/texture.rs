//! CPU-side texture descriptors.
//!
//! A [`Texture2D`] is what sprite frames and atlases talk about: an identity,
//! a size, and optionally the decoded pixels (needed only for atlas packing).
//! GPU residency is the job of [`gfx::TexturePool`](crate::gfx::TexturePool),
//! keyed by the same [`TextureId`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use image::RgbaImage;

/// Process-unique texture identity. Only [`TextureId::next`] mints one.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TextureId(u32);

static NEXT_TEXTURE_ID: AtomicU32 = AtomicU32::new(1);

impl TextureId {
    /// Allocates a fresh id.
    pub fn next() -> Self {
        TextureId(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Decoded texture as consumed by the batching core.
///
/// Cloning is cheap; pixels are shared.
#[derive(Debug, Clone)]
pub struct Texture2D {
    id: TextureId,
    width: u32,
    height: u32,
    image: Option<Arc<RgbaImage>>,
    packable: bool,
}

impl Texture2D {
    /// Texture known only by size (render targets), under a fresh id.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_id(TextureId::next(), width, height)
    }

    /// Another descriptor for an already allocated id (atlas pages).
    pub fn with_id(id: TextureId, width: u32, height: u32) -> Self {
        Self { id, width, height, image: None, packable: false }
    }

    /// Texture with CPU pixels. Such textures may be copied into a dynamic atlas.
    pub fn from_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            id: TextureId::next(),
            width,
            height,
            image: Some(Arc::new(image)),
            packable: true,
        }
    }

    #[inline]
    pub fn id(&self) -> TextureId {
        self.id
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_deref()
    }

    /// Whether the dynamic atlas may absorb this texture.
    #[inline]
    pub fn packable(&self) -> bool {
        self.packable && self.image.is_some()
    }

    pub fn set_packable(&mut self, packable: bool) {
        self.packable = packable;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── identity ──────────────────────────────────────────────────────────

    #[test]
    fn sized_and_decoded_textures_never_share_ids() {
        let sized = Texture2D::new(4, 4);
        let decoded = Texture2D::from_image(RgbaImage::new(4, 4));
        let again = Texture2D::new(4, 4);
        assert_ne!(sized.id(), decoded.id());
        assert_ne!(sized.id(), again.id());
        assert_ne!(decoded.id(), again.id());
    }

    #[test]
    fn descriptor_for_existing_id_keeps_it() {
        let page = TextureId::next();
        let a = Texture2D::with_id(page, 8, 8);
        let b = Texture2D::with_id(page, 8, 8);
        assert_eq!(a.id(), b.id());
        assert!(!a.packable());
    }
}
