use image::{RgbaImage, imageops};

use crate::texture::{Texture2D, TextureId};

/// CPU copy of one atlas page.
///
/// The GPU side re-uploads the page whenever [`generation`](Self::generation)
/// moves past what it last saw.
#[derive(Debug)]
pub struct AtlasTexture {
    id: TextureId,
    pixels: RgbaImage,
    generation: u64,
}

impl AtlasTexture {
    pub fn new(width: u32, height: u32) -> Self {
        Self { id: TextureId::next(), pixels: RgbaImage::new(width, height), generation: 0 }
    }

    #[inline]
    pub fn id(&self) -> TextureId {
        self.id
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[inline]
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Descriptor used by frames redirected into this page.
    pub fn descriptor(&self) -> Texture2D {
        Texture2D::with_id(self.id, self.width(), self.height())
    }

    /// Copies `image` with its top-left corner at `(x, y)`, clipped to the page.
    pub fn draw_texture_at(&mut self, image: &RgbaImage, x: i64, y: i64) {
        imageops::replace(&mut self.pixels, image, x, y);
        self.generation += 1;
    }
}
