//! wgpu backend rendering into a window surface.

use std::collections::HashMap;

use image::RgbaImage;
use wgpu::util::DeviceExt;

use super::{Destination, DrawCall, FrameError, RenderBackend};
use crate::gpu::GpuContext;
use crate::program::{validate_wgsl, ProgramDesc, ProgramId, ShaderError};
use crate::render_graph::quad::{QuadVertex, FULLSCREEN_QUAD};
use crate::render_graph::{Extent, TargetId};
use crate::texture::{AssetId, Texture, TextureFilter, TextureRef};
use crate::uniforms::UniformLayout;

/// Color buffer of an off-screen render target.
struct GpuTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    extent: Extent,
    label: String,
}

impl GpuTarget {
    fn new(gpu: &GpuContext, label: &str, extent: Extent) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: extent.width.max(1),
                height: extent.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: gpu.config.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            extent,
            label: label.to_string(),
        }
    }
}

/// A compiled pass program.
struct GpuProgram {
    label: String,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    layout: UniformLayout,
}

/// Resources for the frame being recorded.
struct Frame {
    surface: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

/// Renders through wgpu.
///
/// Each draw records its own render pass, so clear and load behavior never
/// carries over from one draw to the next. Uniforms are uploaded into a fresh
/// buffer per draw since queue writes land before the encoder executes.
pub struct WgpuBackend {
    gpu: GpuContext,
    quad: wgpu::Buffer,
    target_sampler: wgpu::Sampler,
    fallback: Texture,
    targets: HashMap<TargetId, GpuTarget>,
    assets: HashMap<AssetId, Texture>,
    programs: HashMap<ProgramId, GpuProgram>,
    next_target: u32,
    next_asset: u32,
    next_program: u32,
    frame: Option<Frame>,
}

impl WgpuBackend {
    pub fn new(gpu: GpuContext) -> Self {
        let quad = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Fullscreen Quad"),
                contents: bytemuck::cast_slice(&FULLSCREEN_QUAD),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let target_sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Render Target Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let fallback = Texture::fallback(&gpu);

        Self {
            gpu,
            quad,
            target_sampler,
            fallback,
            targets: HashMap::new(),
            assets: HashMap::new(),
            programs: HashMap::new(),
            next_target: 0,
            next_asset: 0,
            next_program: 0,
            frame: None,
        }
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    /// Resolves a texture reference to a view and sampler, falling back to
    /// the 1x1 texture for released targets and assets.
    fn binding(&self, texture: TextureRef) -> (&wgpu::TextureView, &wgpu::Sampler) {
        let fallback = (&self.fallback.view, &self.fallback.sampler);
        match texture {
            TextureRef::Fallback => fallback,
            TextureRef::Target(id) => self
                .targets
                .get(&id)
                .map(|t| (&t.view, &self.target_sampler))
                .unwrap_or(fallback),
            TextureRef::Asset(id) => self
                .assets
                .get(&id)
                .map(|t| (&t.view, &t.sampler))
                .unwrap_or(fallback),
        }
    }

    fn create_pipeline(&self, desc: &ProgramDesc, source: &str) -> GpuProgram {
        let device = &self.gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&desc.label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];
        for i in 0..desc.layout.texture_slots().len() as u32 {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 1 + 2 * i,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 2 + 2 * i,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} Bind Group Layout", desc.label)),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", desc.label)),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&desc.label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[QuadVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.gpu.config.format,
                    blend: Some(desc.blend.to_wgpu()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        GpuProgram {
            label: desc.label.clone(),
            pipeline,
            bind_group_layout,
            layout: desc.layout.clone(),
        }
    }
}

impl RenderBackend for WgpuBackend {
    fn surface_extent(&self) -> Extent {
        Extent::new(self.gpu.width(), self.gpu.height())
    }

    fn resize_surface(&mut self, extent: Extent) {
        self.gpu.resize(extent.width, extent.height);
    }

    fn create_target(&mut self, label: &str, extent: Extent) -> TargetId {
        let id = TargetId(self.next_target);
        self.next_target += 1;
        self.targets
            .insert(id, GpuTarget::new(&self.gpu, label, extent));
        id
    }

    fn resize_target(&mut self, id: TargetId, extent: Extent) {
        if let Some(target) = self.targets.get_mut(&id) {
            if target.extent != extent {
                let label = std::mem::take(&mut target.label);
                *target = GpuTarget::new(&self.gpu, &label, extent);
            }
        }
    }

    fn release_target(&mut self, id: TargetId) {
        if let Some(target) = self.targets.remove(&id) {
            target.texture.destroy();
        }
    }

    fn target_extent(&self, id: TargetId) -> Option<Extent> {
        self.targets.get(&id).map(|t| t.extent)
    }

    fn upload_texture(&mut self, label: &str, image: &RgbaImage, filter: TextureFilter) -> AssetId {
        let id = AssetId(self.next_asset);
        self.next_asset += 1;
        let texture = Texture::from_rgba(
            &self.gpu,
            image.as_raw(),
            image.width(),
            image.height(),
            label,
            filter,
        );
        self.assets.insert(id, texture);
        id
    }

    fn release_texture(&mut self, id: AssetId) {
        if let Some(texture) = self.assets.remove(&id) {
            texture.texture.destroy();
        }
    }

    fn compile(&mut self, desc: &ProgramDesc) -> Result<ProgramId, ShaderError> {
        let source = desc.source();
        validate_wgsl(&desc.label, &source)?;

        self.gpu
            .device
            .push_error_scope(wgpu::ErrorFilter::Validation);
        let program = self.create_pipeline(desc, &source);
        if let Some(err) = pollster::block_on(self.gpu.device.pop_error_scope()) {
            return Err(ShaderError::Pipeline {
                label: desc.label.clone(),
                message: err.to_string(),
            });
        }

        let id = ProgramId(self.next_program);
        self.next_program += 1;
        log::debug!("Compiled program '{}'", program.label);
        self.programs.insert(id, program);
        Ok(id)
    }

    fn begin_frame(&mut self) -> Result<(), FrameError> {
        let surface = match self.gpu.surface.get_current_texture() {
            Ok(surface) => surface,
            Err(e @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                let (width, height) = (self.gpu.width(), self.gpu.height());
                self.gpu.resize(width, height);
                return Err(FrameError::Surface(e.to_string()));
            }
            Err(e) => return Err(FrameError::Surface(e.to_string())),
        };
        let view = surface
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        self.frame = Some(Frame {
            surface,
            view,
            encoder,
        });
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), FrameError> {
        let mut frame = self.frame.take().ok_or(FrameError::NoActiveFrame)?;
        let result = self.record(&mut frame, call);
        self.frame = Some(frame);
        result
    }

    fn end_frame(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.gpu
                .queue
                .submit(std::iter::once(frame.encoder.finish()));
            frame.surface.present();
        }
    }
}

impl WgpuBackend {
    fn record(&self, frame: &mut Frame, call: &DrawCall<'_>) -> Result<(), FrameError> {
        let program = self
            .programs
            .get(&call.program)
            .ok_or(FrameError::UnknownProgram(call.program))?;
        let view = match call.destination {
            Destination::Surface => &frame.view,
            Destination::Target(id) => {
                &self
                    .targets
                    .get(&id)
                    .ok_or(FrameError::UnknownTarget(id))?
                    .view
            }
        };

        let uniform_buffer = self
            .gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Uniforms", program.label)),
                contents: &program.layout.pack(call.uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        // Texture slots bind in layout order; a slot whose cell no longer holds
        // a texture samples the fallback.
        let bindings: Vec<_> = program
            .layout
            .texture_slots()
            .iter()
            .map(|slot| {
                let texture = call.uniforms.get(slot).and_then(|v| v.as_texture());
                self.binding(TextureRef::or_fallback(texture))
            })
            .collect();

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }];
        for (i, (view, sampler)) in bindings.iter().enumerate() {
            let binding = 1 + 2 * i as u32;
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: binding + 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }

        let bind_group = self
            .gpu
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{} Bind Group", program.label)),
                layout: &program.bind_group_layout,
                entries: &entries,
            });

        let load = match call.clear {
            Some(color) => wgpu::LoadOp::Clear(color.to_wgpu()),
            None => wgpu::LoadOp::Load,
        };

        let mut render_pass = frame
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(call.label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

        render_pass.set_pipeline(&program.pipeline);
        render_pass.set_bind_group(0, &bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.quad.slice(..));
        render_pass.draw(0..FULLSCREEN_QUAD.len() as u32, 0..1);
        Ok(())
    }
}
