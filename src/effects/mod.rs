//! Effect bodies: the per-pixel programs run by shader passes.
//!
//! Every effect provides a WGSL fragment entry point `fs` for the GPU and a
//! reference [`EffectBody::shade`] used by the software backend. Both read
//! the same named uniforms, so a pass behaves the same on either backend.
//!
//! The fragment source can rely on the pass prelude:
//!
//! - `VertexOutput` with a bottom-left-origin `uv`,
//! - `u`, the uniform block generated from the pass's uniform set,
//! - `<slot>_tex` / `<slot>_samp` for each texture slot,
//! - `sample_at(t, s, uv)`, `luma(c)` and `rand01(p)` helpers.

mod blur;
mod border_beam;
mod combine_add;
mod diffuse;
mod expanding_ring;
mod glowing_frame;
mod glyph_dither;
mod noise_warp;
mod preview;
mod ripple_wave;
mod solid;

pub use blur::{Blur, BlurParams};
pub use border_beam::{BorderBeam, BorderBeamParams};
pub use combine_add::CombineAdd;
pub use diffuse::{Diffuse, DiffuseParams};
pub use expanding_ring::{ExpandingRing, ExpandingRingParams};
pub use glowing_frame::{GlowingFrame, GlowingFrameParams};
pub use glyph_dither::{GlyphDither, GlyphDitherParams};
pub use noise_warp::{NoiseWarp, NoiseWarpParams};
pub use preview::Preview;
pub use ripple_wave::{RippleWave, RippleWaveParams};
pub use solid::Solid;

use glam::{Vec2, Vec3, Vec4};

use crate::render_graph::Extent;
use crate::texture::TextureRef;
use crate::uniforms::UniformSet;

/// Conventional uniform slot names shared by the built-in effects.
pub mod slots {
    pub const TIME: &str = "time";
    pub const RESOLUTION: &str = "resolution";
    pub const POINTER: &str = "pointer";
    pub const INPUT: &str = "input";
}

/// Resolves texture references for CPU shading.
pub trait TextureSampler {
    /// Samples `texture` at a bottom-left-origin `uv`, clamped to the edge.
    fn sample(&self, texture: TextureRef, uv: Vec2) -> Vec4;
    /// Pixel size of `texture`.
    fn size(&self, texture: TextureRef) -> Extent;
}

/// Inputs available to [`EffectBody::shade`] for one pixel.
pub struct Fragment<'a> {
    /// Normalized position, origin bottom-left.
    pub uv: Vec2,
    /// Pixel center in framebuffer coordinates, origin top-left.
    pub coord: Vec2,
    uniforms: &'a UniformSet,
    textures: &'a dyn TextureSampler,
}

impl<'a> Fragment<'a> {
    pub fn new(
        uv: Vec2,
        coord: Vec2,
        uniforms: &'a UniformSet,
        textures: &'a dyn TextureSampler,
    ) -> Self {
        Self {
            uv,
            coord,
            uniforms,
            textures,
        }
    }

    /// A float uniform, or 0.0 when absent.
    pub fn float(&self, name: &str) -> f32 {
        self.uniforms
            .get(name)
            .and_then(|v| v.as_float())
            .unwrap_or(0.0)
    }

    pub fn int(&self, name: &str) -> i32 {
        self.uniforms.get(name).and_then(|v| v.as_int()).unwrap_or(0)
    }

    /// An int uniform read as a flag.
    pub fn flag(&self, name: &str) -> bool {
        self.int(name) != 0
    }

    pub fn vec2(&self, name: &str) -> Vec2 {
        self.uniforms
            .get(name)
            .and_then(|v| v.as_vec2())
            .unwrap_or(Vec2::ZERO)
    }

    pub fn vec3(&self, name: &str) -> Vec3 {
        self.uniforms
            .get(name)
            .and_then(|v| v.as_vec3())
            .unwrap_or(Vec3::ZERO)
    }

    pub fn vec4(&self, name: &str) -> Vec4 {
        self.uniforms
            .get(name)
            .and_then(|v| v.as_vec4())
            .unwrap_or(Vec4::ZERO)
    }

    fn texture(&self, slot: &str) -> TextureRef {
        TextureRef::or_fallback(self.uniforms.get(slot).and_then(|v| v.as_texture()))
    }

    /// Samples the texture bound to `slot`.
    pub fn sample(&self, slot: &str, uv: Vec2) -> Vec4 {
        self.textures.sample(self.texture(slot), uv)
    }

    /// Pixel size of the texture bound to `slot`.
    pub fn texture_size(&self, slot: &str) -> Vec2 {
        self.textures.size(self.texture(slot)).as_vec2()
    }
}

/// A full-screen effect.
pub trait EffectBody {
    /// Short name used in labels and diagnostics.
    fn name(&self) -> &'static str;

    /// WGSL source defining `@fragment fn fs(frag: VertexOutput) -> @location(0) vec4f`.
    fn fragment_source(&self) -> &'static str;

    /// CPU reference for one pixel.
    fn shade(&self, frag: &Fragment<'_>) -> Vec4;
}

/// WGSL helpers shared by every effect body.
pub const HELPERS_WGSL: &str = r#"
fn luma(c: vec3f) -> f32 {
    return dot(c, vec3f(0.299, 0.587, 0.114));
}

fn pcg2d(seed: vec2u) -> vec2u {
    var v = seed * 1664525u + 1013904223u;
    v.x += v.y * v.y * 1664525u + 1013904223u;
    v.y += v.x * v.x * 1664525u + 1013904223u;
    v = v ^ (v >> vec2u(16u));
    v.x += v.y * v.y * 1664525u + 1013904223u;
    v.y += v.x * v.x * 1664525u + 1013904223u;
    return v;
}

fn rand01(p: vec2f) -> f32 {
    let v = pcg2d(bitcast<vec2u>(p));
    return f32(v.x ^ v.y) / f32(0xffffffffu);
}
"#;

pub(crate) fn luma(c: Vec3) -> f32 {
    c.dot(Vec3::new(0.299, 0.587, 0.114))
}

pub(crate) fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

pub(crate) fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// GLSL-style `fract`: `x - floor(x)`.
pub(crate) fn fract(x: f32) -> f32 {
    x - x.floor()
}

fn pcg2d(seed: [u32; 2]) -> [u32; 2] {
    const A: u32 = 1664525;
    const C: u32 = 1013904223;
    let [mut x, mut y] = [
        seed[0].wrapping_mul(A).wrapping_add(C),
        seed[1].wrapping_mul(A).wrapping_add(C),
    ];
    x = x.wrapping_add(y.wrapping_mul(y).wrapping_mul(A).wrapping_add(C));
    y = y.wrapping_add(x.wrapping_mul(x).wrapping_mul(A).wrapping_add(C));
    x ^= x >> 16;
    y ^= y >> 16;
    x = x.wrapping_add(y.wrapping_mul(y).wrapping_mul(A).wrapping_add(C));
    y = y.wrapping_add(x.wrapping_mul(x).wrapping_mul(A).wrapping_add(C));
    [x, y]
}

/// Hash of a float pair into `[0, 1]`, bit-compatible with the WGSL `rand01`.
pub(crate) fn rand01(p: Vec2) -> f32 {
    let [x, y] = pcg2d([p.x.to_bits(), p.y.to_bits()]);
    (x ^ y) as f32 / u32::MAX as f32
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rand01_stays_in_unit_range() {
        for i in 0..64 {
            let p = Vec2::new(i as f32 * 0.37 + 0.5, i as f32 * 1.91 + 0.5);
            let r = rand01(p);
            assert!((0.0..=1.0).contains(&r), "{r}");
        }
        assert_eq!(rand01(Vec2::new(3.5, 7.5)), rand01(Vec2::new(3.5, 7.5)));
    }

    #[test]
    fn smoothstep_handles_reversed_edges() {
        assert_eq!(smoothstep(0.12, 0.01, 0.2), 0.0);
        assert_eq!(smoothstep(0.12, 0.01, 0.0), 1.0);
        assert!((smoothstep(0.0, 1.0, 0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn fract_matches_glsl() {
        assert!((fract(-0.25) - 0.75).abs() < 1e-6);
        assert!((fract(2.5) - 0.5).abs() < 1e-6);
    }
}
