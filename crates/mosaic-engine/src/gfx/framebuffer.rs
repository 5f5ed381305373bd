use std::fmt;

use crate::texture::TextureId;

use super::backend::{Backend, NativeHandle};
use super::render_pass::RenderPass;
use super::texture_pool::TexturePool;

/// Size reported by a framebuffer with no attachments (swap-chain backed).
pub const UNBOUNDED: u32 = u32::MAX;

#[derive(Debug, Clone, Default)]
pub struct FramebufferInfo {
    pub render_pass: RenderPass,
    pub color_textures: Vec<TextureId>,
    pub depth_stencil_texture: Option<TextureId>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FramebufferError {
    /// An attachment is not resident in the texture pool.
    MissingTexture(TextureId),
}

impl fmt::Display for FramebufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramebufferError::MissingTexture(id) => write!(f, "attachment {id:?} is not in the texture pool"),
        }
    }
}

impl std::error::Error for FramebufferError {}

/// Render pass bound to concrete attachments.
///
/// Attachment handles are captured at `initialize`; once any of them is
/// reallocated, [`needs_rebuild`](Self::needs_rebuild) reports it and the
/// owner is expected to `destroy` and `initialize` again.
#[derive(Debug, Default)]
pub struct Framebuffer {
    info: FramebufferInfo,
    native: Option<NativeHandle>,
    color_handles: Vec<NativeHandle>,
    depth_stencil_handle: Option<NativeHandle>,
    width: u32,
    height: u32,
}

impl Framebuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize<B: Backend>(
        &mut self,
        backend: &mut B,
        pool: &TexturePool,
        info: FramebufferInfo,
    ) -> Result<(), FramebufferError> {
        let lookup = |id: TextureId| pool.get(id).ok_or(FramebufferError::MissingTexture(id));

        let colors = info
            .color_textures
            .iter()
            .map(|&id| lookup(id))
            .collect::<Result<Vec<_>, _>>()?;
        let depth = info.depth_stencil_texture.map(lookup).transpose()?;

        let (width, height) = colors
            .first()
            .copied()
            .or(depth)
            .map_or((UNBOUNDED, UNBOUNDED), |t| (t.width(), t.height()));

        if self.native.is_some() {
            self.destroy(backend);
        }

        self.color_handles = colors.iter().map(|t| t.handle).collect();
        self.depth_stencil_handle = depth.map(|t| t.handle);
        self.native = Some(backend.create_framebuffer(&info.render_pass, &self.color_handles, self.depth_stencil_handle));
        self.width = width;
        self.height = height;
        self.info = info;
        Ok(())
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Overrides the derived size; used for swap-chain framebuffers.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn render_pass(&self) -> &RenderPass {
        &self.info.render_pass
    }

    pub fn color_textures(&self) -> &[TextureId] {
        &self.info.color_textures
    }

    pub fn depth_stencil_texture(&self) -> Option<TextureId> {
        self.info.depth_stencil_texture
    }

    pub fn native(&self) -> Option<NativeHandle> {
        self.native
    }

    /// True when an attachment was reallocated or removed since `initialize`.
    pub fn needs_rebuild(&self, pool: &TexturePool) -> bool {
        if self.native.is_none() {
            return false;
        }
        let current = |id: TextureId| pool.get(id).map(|t| t.handle);

        let colors_moved = self
            .info
            .color_textures
            .iter()
            .zip(&self.color_handles)
            .any(|(&id, &captured)| current(id) != Some(captured));

        colors_moved || self.info.depth_stencil_texture.and_then(current) != self.depth_stencil_handle
    }

    /// Releases the native framebuffer. Safe to call repeatedly.
    pub fn destroy<B: Backend>(&mut self, backend: &mut B) {
        if let Some(native) = self.native.take() {
            backend.destroy_framebuffer(native);
            self.color_handles.clear();
            self.depth_stencil_handle = None;
        }
    }
}
