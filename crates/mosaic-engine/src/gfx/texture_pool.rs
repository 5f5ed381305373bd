use std::collections::HashMap;

use crate::texture::TextureId;

use super::backend::{Backend, NativeHandle};

/// Creation parameters for a GPU texture.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
}

impl TextureInfo {
    /// Sampled sRGB color texture that can also be rendered to and written.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, ..Default::default() }
    }
}

impl Default for TextureInfo {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_DST,
        }
    }
}

/// A texture as the pool tracks it.
#[derive(Debug, Clone, PartialEq)]
pub struct PooledTexture {
    pub info: TextureInfo,
    pub handle: NativeHandle,
}

impl PooledTexture {
    #[inline]
    pub fn width(&self) -> u32 {
        self.info.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.info.height
    }
}

/// GPU residency for textures, keyed by [`TextureId`].
///
/// Framebuffers capture the [`NativeHandle`]s they were built with; a resize
/// issues a new handle, which is how they learn they must be rebuilt.
#[derive(Debug, Default)]
pub struct TexturePool {
    textures: HashMap<TextureId, PooledTexture>,
}

impl TexturePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn get(&self, id: TextureId) -> Option<&PooledTexture> {
        self.textures.get(&id)
    }

    /// Creates (or recreates) the native texture for `id`.
    pub fn create<B: Backend>(&mut self, backend: &mut B, id: TextureId, info: TextureInfo) -> NativeHandle {
        if let Some(old) = self.textures.remove(&id) {
            backend.destroy_texture(old.handle);
        }
        let handle = backend.create_texture(&info);
        log::debug!("texture pool: {:?} -> {:?} ({}x{})", id, handle, info.width, info.height);
        self.textures.insert(id, PooledTexture { info, handle });
        handle
    }

    /// Reallocates at a new size. Returns the new handle, or `None` when `id`
    /// is unknown. Same-size resizes keep the current allocation.
    pub fn resize<B: Backend>(&mut self, backend: &mut B, id: TextureId, width: u32, height: u32) -> Option<NativeHandle> {
        let tex = self.textures.get_mut(&id)?;
        if tex.info.width == width && tex.info.height == height {
            return Some(tex.handle);
        }
        backend.destroy_texture(tex.handle);
        tex.info.width = width;
        tex.info.height = height;
        tex.handle = backend.create_texture(&tex.info);
        Some(tex.handle)
    }

    pub fn remove<B: Backend>(&mut self, backend: &mut B, id: TextureId) -> bool {
        match self.textures.remove(&id) {
            Some(tex) => {
                backend.destroy_texture(tex.handle);
                true
            }
            None => false,
        }
    }

    /// Destroys every texture.
    pub fn clear<B: Backend>(&mut self, backend: &mut B) {
        for (_, tex) in self.textures.drain() {
            backend.destroy_texture(tex.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::HeadlessBackend;

    #[test]
    fn resize_issues_a_new_handle() {
        let mut backend = HeadlessBackend::new();
        let mut pool = TexturePool::new();
        let id = TextureId::next();

        let first = pool.create(&mut backend, id, TextureInfo::new(64, 64));
        let second = pool.resize(&mut backend, id, 128, 64).unwrap();
        assert_ne!(first, second);
        assert_eq!(pool.get(id).unwrap().width(), 128);
        assert_eq!(backend.live_textures(), 1);
        assert_eq!(backend.texture_info(second).unwrap().width, 128);
    }

    #[test]
    fn same_size_resize_keeps_handle() {
        let mut backend = HeadlessBackend::new();
        let mut pool = TexturePool::new();
        let id = TextureId::next();
        let h = pool.create(&mut backend, id, TextureInfo::new(8, 8));
        assert_eq!(pool.resize(&mut backend, id, 8, 8), Some(h));
    }

    #[test]
    fn unknown_ids() {
        let mut backend = HeadlessBackend::new();
        let mut pool = TexturePool::new();
        let id = TextureId::next();
        assert!(pool.resize(&mut backend, id, 1, 1).is_none());
        assert!(!pool.remove(&mut backend, id));
    }

    #[test]
    fn recreate_and_clear_release_natives() {
        let mut backend = HeadlessBackend::new();
        let mut pool = TexturePool::new();
        let (a, b) = (TextureId::next(), TextureId::next());
        pool.create(&mut backend, a, TextureInfo::new(8, 8));
        pool.create(&mut backend, a, TextureInfo::new(16, 16));
        pool.create(&mut backend, b, TextureInfo::new(16, 16));
        assert_eq!(backend.live_textures(), 2);

        pool.clear(&mut backend);
        assert!(pool.is_empty());
        assert_eq!(backend.live_textures(), 0);
    }
}
