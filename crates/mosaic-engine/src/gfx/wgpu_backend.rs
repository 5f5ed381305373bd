use std::collections::HashMap;

use anyhow::{Context, Result};
use image::RgbaImage;
use winit::window::Window;

use super::backend::{Backend, HandleAllocator, NativeHandle};
use super::queue::QueueInfo;
use super::render_pass::RenderPass;
use super::surface::{self, WindowSurface};
use super::texture_pool::TextureInfo;

/// Initialization parameters for the wgpu backend.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Swap behavior. FIFO is supported everywhere.
    pub present_mode: wgpu::PresentMode,

    /// Falls back to the first supported mode when unsupported.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub required_features: wgpu::Features,
    pub required_limits: wgpu::Limits,

    /// Hint only; support depends on platform.
    pub desired_maximum_frame_latency: u32,

    pub power_preference: wgpu::PowerPreference,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
            power_preference: wgpu::PowerPreference::HighPerformance,
        }
    }
}

struct NativeTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// Attachment views a framebuffer handle resolves to.
pub struct WgpuFramebuffer {
    pub render_pass: RenderPass,
    pub colors: Vec<wgpu::TextureView>,
    pub depth_stencil: Option<wgpu::TextureView>,
}

/// [`Backend`] over a wgpu device, optionally bound to a window surface.
///
/// wgpu exposes a single queue per device, so every queue handle submits to
/// it. Framebuffers are view bundles; wgpu has no framebuffer object.
pub struct WgpuBackend<'w> {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: Option<WindowSurface<'w>>,
    handles: HandleAllocator,
    textures: HashMap<NativeHandle, NativeTexture>,
    framebuffers: HashMap<NativeHandle, WgpuFramebuffer>,
}

impl WgpuBackend<'static> {
    /// Device without a surface, for offscreen rendering.
    pub async fn headless(init: GpuInit) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;
        let (device, queue) = request_device(&adapter, &init).await?;
        Ok(Self::from_parts(adapter, device, queue, None))
    }

    pub fn headless_blocking(init: GpuInit) -> Result<Self> {
        pollster::block_on(Self::headless(init))
    }
}

impl<'w> WgpuBackend<'w> {
    /// Device plus a surface bound to `window`. The window must outlive the
    /// backend.
    pub async fn with_window(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let raw = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(&raw),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;
        let (device, queue) = request_device(&adapter, &init).await?;

        let caps = raw.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&caps, init.prefer_srgb)
            .context("no supported surface formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: init.present_mode,
            alpha_mode: surface::choose_alpha_mode(&caps, init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        raw.configure(&device, &config);

        let surface = WindowSurface::new(raw, config, size);
        Ok(Self::from_parts(adapter, device, queue, Some(surface)))
    }

    pub fn with_window_blocking(window: &'w Window, init: GpuInit) -> Result<Self> {
        pollster::block_on(Self::with_window(window, init))
    }

    fn from_parts(
        adapter: wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface: Option<WindowSurface<'w>>,
    ) -> Self {
        let info = adapter.get_info();
        log::info!("gpu: {} ({:?})", info.name, info.backend);
        Self {
            adapter,
            device,
            queue,
            surface,
            handles: HandleAllocator::default(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
        }
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface(&self) -> Option<&WindowSurface<'w>> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut WindowSurface<'w>> {
        self.surface.as_mut()
    }

    pub fn texture(&self, handle: NativeHandle) -> Option<&wgpu::Texture> {
        self.textures.get(&handle).map(|t| &t.texture)
    }

    pub fn texture_view(&self, handle: NativeHandle) -> Option<&wgpu::TextureView> {
        self.textures.get(&handle).map(|t| &t.view)
    }

    pub fn framebuffer(&self, handle: NativeHandle) -> Option<&WgpuFramebuffer> {
        self.framebuffers.get(&handle)
    }

    pub fn create_encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    /// Copies an RGBA8 image into a pooled texture of the same size.
    pub fn upload_rgba(&self, texture: NativeHandle, image: &RgbaImage) -> Result<()> {
        let tex = self
            .texture(texture)
            .with_context(|| format!("unknown texture handle {texture:?}"))?;
        let (w, h) = image.dimensions();
        anyhow::ensure!(
            tex.width() == w && tex.height() == h,
            "image is {w}x{h}, texture is {}x{}",
            tex.width(),
            tex.height()
        );

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: tex,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * w),
                rows_per_image: Some(h),
            },
            wgpu::Extent3d { width: w, height: h, depth_or_array_layers: 1 },
        );
        Ok(())
    }
}

async fn request_device(adapter: &wgpu::Adapter, init: &GpuInit) -> Result<(wgpu::Device, wgpu::Queue)> {
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("mosaic device"),
            required_features: init.required_features,
            required_limits: init.required_limits.clone(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to create wgpu device/queue")
}

impl Backend for WgpuBackend<'_> {
    type CommandBuffer = wgpu::CommandBuffer;

    fn create_queue(&mut self, info: &QueueInfo) -> NativeHandle {
        log::debug!("gpu: {:?} queue maps onto the device queue", info.queue_type);
        self.handles.next()
    }

    fn destroy_queue(&mut self, _queue: NativeHandle) {}

    fn submit<I>(&mut self, _queue: NativeHandle, buffers: I)
    where
        I: IntoIterator<Item = wgpu::CommandBuffer>,
    {
        self.queue.submit(buffers);
    }

    fn create_texture(&mut self, info: &TextureInfo) -> NativeHandle {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("mosaic pooled texture"),
            size: wgpu::Extent3d {
                width: info.width.max(1),
                height: info.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: info.format,
            usage: info.usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let handle = self.handles.next();
        self.textures.insert(handle, NativeTexture { texture, view });
        handle
    }

    fn destroy_texture(&mut self, texture: NativeHandle) {
        if let Some(t) = self.textures.remove(&texture) {
            t.texture.destroy();
        }
    }

    fn create_framebuffer(
        &mut self,
        render_pass: &RenderPass,
        colors: &[NativeHandle],
        depth_stencil: Option<NativeHandle>,
    ) -> NativeHandle {
        let view = |h: &NativeHandle| self.texture_view(*h).cloned();
        let fb = WgpuFramebuffer {
            render_pass: render_pass.clone(),
            colors: colors.iter().filter_map(view).collect(),
            depth_stencil: depth_stencil.as_ref().and_then(view),
        };
        if fb.colors.len() != colors.len() {
            log::warn!("gpu: framebuffer created with unknown color attachments");
        }
        let handle = self.handles.next();
        self.framebuffers.insert(handle, fb);
        handle
    }

    fn destroy_framebuffer(&mut self, framebuffer: NativeHandle) {
        self.framebuffers.remove(&framebuffer);
    }
}
