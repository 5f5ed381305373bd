use std::collections::HashMap;

use super::queue::QueueInfo;
use super::render_pass::RenderPass;
use super::texture_pool::TextureInfo;

/// Identity of a backend-owned resource.
///
/// A reallocated resource always gets a fresh handle, so comparing handles is
/// enough to notice that a texture was recreated underneath a framebuffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NativeHandle(pub u64);

/// Hands out monotonically increasing handles. Zero is never issued.
#[derive(Debug, Default)]
pub(crate) struct HandleAllocator {
    last: u64,
}

impl HandleAllocator {
    pub(crate) fn next(&mut self) -> NativeHandle {
        self.last += 1;
        NativeHandle(self.last)
    }
}

/// Native graphics API seam.
///
/// Front-end objects (`Queue`, `Framebuffer`, `TexturePool`) keep their own
/// bookkeeping and only call into the backend to create, destroy and submit.
pub trait Backend {
    /// Recorded GPU work as the native API represents it.
    type CommandBuffer;

    fn create_queue(&mut self, info: &QueueInfo) -> NativeHandle;
    fn destroy_queue(&mut self, queue: NativeHandle);

    /// Hands buffers to the GPU in the given order. Must drain `buffers`.
    fn submit<I>(&mut self, queue: NativeHandle, buffers: I)
    where
        I: IntoIterator<Item = Self::CommandBuffer>;

    fn create_texture(&mut self, info: &TextureInfo) -> NativeHandle;
    fn destroy_texture(&mut self, texture: NativeHandle);

    fn create_framebuffer(
        &mut self,
        render_pass: &RenderPass,
        colors: &[NativeHandle],
        depth_stencil: Option<NativeHandle>,
    ) -> NativeHandle;
    fn destroy_framebuffer(&mut self, framebuffer: NativeHandle);
}

// ── headless ──────────────────────────────────────────────────────────────

/// Command payload for [`HeadlessBackend`]: a caller-chosen tag.
pub type HeadlessCommands = u32;

/// Backend without a GPU. Allocates handles and records what it was asked to
/// do so tests can inspect it.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    handles: HandleAllocator,
    queues: Vec<NativeHandle>,
    textures: HashMap<NativeHandle, TextureInfo>,
    framebuffers: HashMap<NativeHandle, Vec<NativeHandle>>,
    submissions: Vec<(NativeHandle, Vec<HeadlessCommands>)>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `submit` call so far, in order.
    pub fn submissions(&self) -> &[(NativeHandle, Vec<HeadlessCommands>)] {
        &self.submissions
    }

    pub fn live_queues(&self) -> usize {
        self.queues.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn texture_info(&self, texture: NativeHandle) -> Option<&TextureInfo> {
        self.textures.get(&texture)
    }

    /// Attachments a framebuffer was created with, depth-stencil last.
    pub fn framebuffer_attachments(&self, framebuffer: NativeHandle) -> Option<&[NativeHandle]> {
        self.framebuffers.get(&framebuffer).map(Vec::as_slice)
    }
}

impl Backend for HeadlessBackend {
    type CommandBuffer = HeadlessCommands;

    fn create_queue(&mut self, _info: &QueueInfo) -> NativeHandle {
        let handle = self.handles.next();
        self.queues.push(handle);
        handle
    }

    fn destroy_queue(&mut self, queue: NativeHandle) {
        self.queues.retain(|&q| q != queue);
    }

    fn submit<I>(&mut self, queue: NativeHandle, buffers: I)
    where
        I: IntoIterator<Item = HeadlessCommands>,
    {
        self.submissions.push((queue, buffers.into_iter().collect()));
    }

    fn create_texture(&mut self, info: &TextureInfo) -> NativeHandle {
        let handle = self.handles.next();
        self.textures.insert(handle, info.clone());
        handle
    }

    fn destroy_texture(&mut self, texture: NativeHandle) {
        self.textures.remove(&texture);
    }

    fn create_framebuffer(
        &mut self,
        _render_pass: &RenderPass,
        colors: &[NativeHandle],
        depth_stencil: Option<NativeHandle>,
    ) -> NativeHandle {
        let handle = self.handles.next();
        let mut attachments = colors.to_vec();
        attachments.extend(depth_stencil);
        self.framebuffers.insert(handle, attachments);
        handle
    }

    fn destroy_framebuffer(&mut self, framebuffer: NativeHandle) {
        self.framebuffers.remove(&framebuffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique_and_nonzero() {
        let mut b = HeadlessBackend::new();
        let q = b.create_queue(&QueueInfo::default());
        let t = b.create_texture(&TextureInfo::new(4, 4));
        assert_ne!(q, t);
        assert!(q.0 > 0 && t.0 > 0);
    }

    #[test]
    fn destroy_forgets_resources() {
        let mut b = HeadlessBackend::new();
        let t = b.create_texture(&TextureInfo::new(4, 4));
        let fb = b.create_framebuffer(&RenderPass::default(), &[t], None);
        assert_eq!(b.framebuffer_attachments(fb), Some(&[t][..]));

        b.destroy_framebuffer(fb);
        b.destroy_texture(t);
        assert_eq!(b.live_framebuffers(), 0);
        assert_eq!(b.live_textures(), 0);
    }
}
