use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use crate::batch::{Batcher, DrawBatch, FLOAT_STRIDE, MeshBuffer};
use crate::coords::Viewport;

use super::backend::NativeHandle;
use super::command_buffer::CommandBuffer;
use super::render_pass::LoadOp;
use super::texture_pool::TexturePool;
use super::wgpu_backend::WgpuBackend;

// ── blend ─────────────────────────────────────────────────────────────────

fn premul_alpha_blend() -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState { color: component, alpha: component }
}

// ── gpu types ─────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ViewportUniform {
    viewport: [f32; 2],
    _pad: [f32; 2], // 16-byte alignment
}

/// GPU view of one mesh-buffer vertex record.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct SpriteVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

const _: () = assert!(std::mem::size_of::<SpriteVertex>() == FLOAT_STRIDE * 4);

impl SpriteVertex {
    const ATTRS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2, 2 => Float32x4];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// GPU copy of one [`MeshBuffer`].
struct GpuMesh {
    vbo: wgpu::Buffer,
    vbo_capacity: u64,
    ibo: wgpu::Buffer,
    ibo_capacity: u64,
}

/// Where a frame's batches are drawn.
pub struct SpriteTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub viewport: Viewport,
    pub load: LoadOp,
}

// ── pipeline ──────────────────────────────────────────────────────────────

/// Draws a [`Batcher`]'s frame output.
///
/// Mesh buffers are uploaded as-is (the vertex record layout is the GPU
/// layout) and each [`DrawBatch`] becomes one indexed draw with its texture
/// bound. Batches without a texture sample a 1×1 white texture.
#[derive(Default)]
pub struct SpriteBatchPipeline {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    viewport_layout: Option<wgpu::BindGroupLayout>,
    texture_layout: Option<wgpu::BindGroupLayout>,

    viewport_ubo: Option<wgpu::Buffer>,
    viewport_group: Option<wgpu::BindGroup>,
    sampler: Option<wgpu::Sampler>,
    white: Option<(wgpu::Texture, wgpu::BindGroup)>,
    texture_groups: HashMap<NativeHandle, wgpu::BindGroup>,

    meshes: Vec<GpuMesh>,
    index_scratch: Vec<u16>,
}

impl SpriteBatchPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads every mesh buffer and records this frame's batches into
    /// `target`, counting each draw in `cmd`.
    pub fn encode(
        &mut self,
        backend: &WgpuBackend<'_>,
        pool: &TexturePool,
        target: &mut SpriteTarget<'_>,
        batcher: &Batcher,
        cmd: &mut CommandBuffer<wgpu::CommandBuffer>,
    ) {
        if !target.viewport.is_valid() {
            log::debug!("sprite pipeline: invalid viewport {:?}, skipping", target.viewport);
            return;
        }
        let device = backend.device();
        let queue = backend.queue();

        self.ensure_pipeline(device, target.format);
        self.ensure_bindings(device, queue);
        self.upload_meshes(device, queue, batcher.buffers());

        if let Some(ubo) = &self.viewport_ubo {
            let u = ViewportUniform {
                viewport: [target.viewport.width, target.viewport.height],
                _pad: [0.0; 2],
            };
            queue.write_buffer(ubo, 0, bytemuck::bytes_of(&u));
        }

        let batches = batcher.batches();
        let handles: Vec<Option<NativeHandle>> = batches
            .iter()
            .map(|b| b.key.texture.and_then(|id| pool.get(id)).map(|t| t.handle))
            .collect();
        self.prune_texture_groups(backend);
        for handle in handles.iter().flatten() {
            self.ensure_texture_group(backend, *handle);
        }

        let (Some(pipeline), Some(viewport_group), Some((_, white_group))) =
            (&self.pipeline, &self.viewport_group, &self.white)
        else {
            return;
        };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("mosaic sprite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: target.load.to_wgpu(),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, viewport_group, &[]);

        let mut bound_mesh = None;
        for (batch, handle) in batches.iter().zip(&handles) {
            let Some(mesh) = self.meshes.get(batch.buffer_id as usize) else { continue };
            if batch.index_count == 0 {
                continue;
            }
            if bound_mesh != Some(batch.buffer_id) {
                rpass.set_vertex_buffer(0, mesh.vbo.slice(..));
                rpass.set_index_buffer(mesh.ibo.slice(..), wgpu::IndexFormat::Uint16);
                bound_mesh = Some(batch.buffer_id);
            }

            let group = handle
                .and_then(|h| self.texture_groups.get(&h))
                .unwrap_or(white_group);
            rpass.set_bind_group(1, group, &[]);

            let DrawBatch { index_start, index_count, .. } = *batch;
            rpass.draw_indexed(index_start..index_start + index_count, 0, 0..1);
            cmd.record_draw(index_count, 0);
        }
    }

    // ── lazy init helpers ──────────────────────────────────────────────────

    fn ensure_pipeline(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        if self.pipeline.is_some() && self.pipeline_format == Some(format) {
            return;
        }

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mosaic sprite shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sprite.wgsl").into()),
        });

        let viewport_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mosaic sprite viewport bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<ViewportUniform>() as u64),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mosaic sprite texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mosaic sprite pipeline layout"),
            bind_group_layouts: &[&viewport_layout, &texture_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("mosaic sprite pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[SpriteVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        self.pipeline_format = Some(format);
        self.pipeline = Some(pipeline);
        self.viewport_layout = Some(viewport_layout);
        self.texture_layout = Some(texture_layout);
        // groups were built against the old layouts
        self.viewport_group = None;
        self.viewport_ubo = None;
        self.white = None;
        self.texture_groups.clear();
    }

    fn ensure_bindings(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        let (Some(viewport_layout), Some(texture_layout)) = (&self.viewport_layout, &self.texture_layout) else {
            return;
        };

        if self.viewport_group.is_none() {
            let ubo = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("mosaic sprite viewport ubo"),
                size: std::mem::size_of::<ViewportUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.viewport_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("mosaic sprite viewport bind group"),
                layout: viewport_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: ubo.as_entire_binding(),
                }],
            }));
            self.viewport_ubo = Some(ubo);
        }

        let sampler = self.sampler.get_or_insert_with(|| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("mosaic sprite sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                ..Default::default()
            })
        });

        if self.white.is_none() {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("mosaic white texture"),
                size: wgpu::Extent3d { width: 1, height: 1, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &[255; 4],
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4),
                    rows_per_image: Some(1),
                },
                wgpu::Extent3d { width: 1, height: 1, depth_or_array_layers: 1 },
            );
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            let group = texture_group(device, texture_layout, &view, sampler);
            self.white = Some((texture, group));
        }
    }

    fn ensure_texture_group(&mut self, backend: &WgpuBackend<'_>, handle: NativeHandle) {
        if self.texture_groups.contains_key(&handle) {
            return;
        }
        let (Some(layout), Some(sampler)) = (&self.texture_layout, &self.sampler) else { return };
        let Some(view) = backend.texture_view(handle) else {
            log::trace!("sprite pipeline: {handle:?} not resident, drawing untextured");
            return;
        };
        let group = texture_group(backend.device(), layout, view, sampler);
        self.texture_groups.insert(handle, group);
    }

    /// Drops bind groups whose texture was destroyed or reallocated.
    fn prune_texture_groups(&mut self, backend: &WgpuBackend<'_>) {
        self.texture_groups.retain(|&h, _| backend.texture_view(h).is_some());
    }

    fn upload_meshes(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, buffers: &[MeshBuffer]) {
        for (i, buffer) in buffers.iter().enumerate() {
            let vertices: &[u8] = bytemuck::cast_slice(buffer.v_data());

            // write_buffer wants 4-byte multiples; pad an odd index count
            self.index_scratch.clear();
            self.index_scratch.extend_from_slice(buffer.i_data());
            if self.index_scratch.len() % 2 == 1 {
                self.index_scratch.push(0);
            }
            let indices: &[u8] = bytemuck::cast_slice(&self.index_scratch);

            if i >= self.meshes.len() {
                self.meshes.push(GpuMesh {
                    vbo: vertex_buffer(device, 0),
                    vbo_capacity: 0,
                    ibo: index_buffer(device, 0),
                    ibo_capacity: 0,
                });
            }
            let mesh = &mut self.meshes[i];

            let needed = vertices.len() as u64;
            if needed > mesh.vbo_capacity {
                let cap = needed.next_power_of_two().max(64);
                mesh.vbo = vertex_buffer(device, cap);
                mesh.vbo_capacity = cap;
            }
            let needed = indices.len() as u64;
            if needed > mesh.ibo_capacity {
                let cap = needed.next_power_of_two().max(64);
                mesh.ibo = index_buffer(device, cap);
                mesh.ibo_capacity = cap;
            }

            if !vertices.is_empty() {
                queue.write_buffer(&mesh.vbo, 0, vertices);
            }
            if !indices.is_empty() {
                queue.write_buffer(&mesh.ibo, 0, indices);
            }
        }
    }
}

fn vertex_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("mosaic mesh vbo"),
        size: size.max(64),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn index_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("mosaic mesh ibo"),
        size: size.max(64),
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn texture_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("mosaic sprite texture bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}
