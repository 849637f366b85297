//! Texture handles and GPU texture storage.

use crate::gpu::GpuContext;
use crate::render_graph::TargetId;

/// RGBA8 contents of the neutral fallback texture: opaque black.
pub const FALLBACK_RGBA: [u8; 4] = [0, 0, 0, 255];

/// Identifies an uploaded asset texture (for example a sprite sheet).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AssetId(pub(crate) u32);

/// A non-owning reference to a texture a pass can sample.
///
/// References are resolved by the backend at draw time, so a reference to a
/// render target stays valid across resizes of that target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureRef {
    /// The 1x1 opaque fallback, used whenever a real input is unavailable.
    Fallback,
    /// The color buffer of a render target.
    Target(TargetId),
    /// An uploaded asset texture.
    Asset(AssetId),
}

impl TextureRef {
    /// Maps `None` to the fallback texture.
    pub fn or_fallback(input: Option<TextureRef>) -> TextureRef {
        input.unwrap_or(TextureRef::Fallback)
    }
}

/// Sampling filter for uploaded textures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// A GPU texture that can be bound to shaders.
#[derive(Debug)]
pub struct Texture {
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
}

impl Texture {
    /// Create a texture from raw RGBA data.
    pub fn from_rgba(
        gpu: &GpuContext,
        data: &[u8],
        width: u32,
        height: u32,
        label: &str,
        filter: TextureFilter,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let filter_mode = match filter {
            TextureFilter::Nearest => wgpu::FilterMode::Nearest,
            TextureFilter::Linear => wgpu::FilterMode::Linear,
        };
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter_mode,
            min_filter: filter_mode,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// The 1x1 opaque fallback texture.
    pub fn fallback(gpu: &GpuContext) -> Self {
        Self::from_rgba(
            gpu,
            &FALLBACK_RGBA,
            1,
            1,
            "Fallback Texture",
            TextureFilter::Nearest,
        )
    }
}
