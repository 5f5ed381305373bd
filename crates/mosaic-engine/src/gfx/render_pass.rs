use crate::coords::ColorRgba;

/// What happens to an attachment's previous contents when a pass begins.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum LoadOp {
    #[default]
    Load,
    Clear(ColorRgba),
    Discard,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColorAttachment {
    pub format: wgpu::TextureFormat,
    pub load: LoadOp,
    pub store: bool,
}

impl Default for ColorAttachment {
    fn default() -> Self {
        Self {
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            load: LoadOp::Load,
            store: true,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DepthStencilAttachment {
    pub format: wgpu::TextureFormat,
    pub clear_depth: Option<f32>,
    pub clear_stencil: Option<u32>,
}

impl Default for DepthStencilAttachment {
    fn default() -> Self {
        Self {
            format: wgpu::TextureFormat::Depth24PlusStencil8,
            clear_depth: Some(1.0),
            clear_stencil: Some(0),
        }
    }
}

/// Attachment layout a framebuffer is built against.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderPass {
    pub colors: Vec<ColorAttachment>,
    pub depth_stencil: Option<DepthStencilAttachment>,
}

impl RenderPass {
    /// One color target in `format`, loaded and stored.
    pub fn single(format: wgpu::TextureFormat) -> Self {
        Self {
            colors: vec![ColorAttachment { format, ..Default::default() }],
            depth_stencil: None,
        }
    }

    pub fn with_clear(mut self, color: ColorRgba) -> Self {
        for c in &mut self.colors {
            c.load = LoadOp::Clear(color);
        }
        self
    }
}

impl LoadOp {
    pub(crate) fn to_wgpu(self) -> wgpu::LoadOp<wgpu::Color> {
        match self {
            // wgpu has no discard load; clearing is the cheapest equivalent
            LoadOp::Discard => wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            LoadOp::Load => wgpu::LoadOp::Load,
            LoadOp::Clear(c) => wgpu::LoadOp::Clear(wgpu::Color {
                r: c.r as f64,
                g: c.g as f64,
                b: c.b as f64,
                a: c.a as f64,
            }),
        }
    }
}
