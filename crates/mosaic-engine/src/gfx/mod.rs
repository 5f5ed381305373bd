//! Device-agnostic GPU front-end.
//!
//! [`Queue`], [`Framebuffer`] and [`TexturePool`] keep the bookkeeping
//! (draw statistics, attachment sizes, native-handle identity) and talk to
//! the graphics API only through the [`Backend`] trait. Two backends ship:
//! - [`HeadlessBackend`]: no GPU, records calls; what the tests use
//! - [`WgpuBackend`]: wgpu device, offscreen or bound to a winit window
//!
//! [`SpriteBatchPipeline`] is the wgpu consumer of the batcher's output.

mod backend;
mod command_buffer;
mod framebuffer;
mod queue;
mod render_pass;
mod sprite_pipeline;
mod surface;
mod texture_pool;
mod wgpu_backend;

pub use backend::{Backend, HeadlessBackend, HeadlessCommands, NativeHandle};
pub use command_buffer::CommandBuffer;
pub use framebuffer::{Framebuffer, FramebufferError, FramebufferInfo, UNBOUNDED};
pub use queue::{Queue, QueueInfo, QueueState, QueueStats, QueueType};
pub use render_pass::{ColorAttachment, DepthStencilAttachment, LoadOp, RenderPass};
pub use sprite_pipeline::{SpriteBatchPipeline, SpriteTarget, SpriteVertex};
pub use surface::{SurfaceErrorAction, SurfaceFrame, WindowSurface};
pub use texture_pool::{PooledTexture, TextureInfo, TexturePool};
pub use wgpu_backend::{GpuInit, WgpuBackend, WgpuFramebuffer};
