//! Stochastic disc blur that fades out away from the pointer.

use glam::{Vec2, Vec4};

use super::{fract, mix, rand01, slots, EffectBody, Fragment};
use crate::texture::TextureRef;
use crate::uniforms::{UniformError, UniformSet};

const ITERATIONS: u32 = 24;

const SHADER: &str = r#"
const DIFFUSE_ITERATIONS: f32 = 24.0;

@fragment
fn fs(frag: VertexOutput) -> @location(0) vec4f {
    let uv = frag.uv;
    let aspect = u.resolution.x / max(u.resolution.y, 1.0);
    let scale = vec2f(aspect, 1.0);
    let delta = fract(floor(u.time) / 20.0);

    let radius = mix(0.0001, 1.5, clamp(u.radius, 0.0, 1.0));
    let falloff = max(0.0, 1.0 - distance(uv * scale, u.pointer * scale) / radius);
    let amount = 0.18 * falloff;
    if (amount <= 0.001) {
        return sample_at(input_tex, input_samp, uv);
    }

    let dir = vec2f(0.5 / aspect, 0.5) * amount * 0.4;
    var sum = vec4f(0.0);
    for (var i = 1; i <= 24; i++) {
        let th = f32(i) / DIFFUSE_ITERATIONS;
        let r1 = rand01(uv + th + delta);
        let r2 = rand01(uv + th * 2.0 + delta);
        let r3 = rand01(uv + th * 3.0 + delta);
        let offset = vec2f(r1 * 2.0 - 1.0, r2 * 2.0 - 1.0) * mix(1.0, r3, 0.8);
        sum += sample_at(input_tex, input_samp, uv + offset * dir);
    }
    return sum / DIFFUSE_ITERATIONS;
}
"#;

/// Diffuse parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct DiffuseParams {
    /// Reach of the effect around the pointer in `[0, 1]`.
    pub radius: f32,
}

impl Default for DiffuseParams {
    fn default() -> Self {
        Self { radius: 0.5 }
    }
}

impl DiffuseParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn uniforms(&self) -> UniformSet {
        UniformSet::new()
            .with(slots::TIME, 0.0f32)
            .with(slots::RESOLUTION, Vec2::ONE)
            .with(slots::POINTER, Vec2::splat(0.5))
            .with("radius", self.radius)
            .with(slots::INPUT, TextureRef::Fallback)
    }

    pub fn apply(&self, set: &UniformSet) -> Result<(), UniformError> {
        set.set("radius", self.radius)
    }
}

/// Averages 24 jittered input samples inside a pointer-centred disc.
pub struct Diffuse;

impl EffectBody for Diffuse {
    fn name(&self) -> &'static str {
        "diffuse"
    }

    fn fragment_source(&self) -> &'static str {
        SHADER
    }

    fn shade(&self, frag: &Fragment<'_>) -> Vec4 {
        let uv = frag.uv;
        let resolution = frag.vec2(slots::RESOLUTION);
        let aspect = resolution.x / resolution.y.max(1.0);
        let scale = Vec2::new(aspect, 1.0);
        let delta = fract(frag.float(slots::TIME).floor() / 20.0);

        let radius = mix(0.0001, 1.5, frag.float("radius").clamp(0.0, 1.0));
        let falloff =
            (1.0 - (uv * scale).distance(frag.vec2(slots::POINTER) * scale) / radius).max(0.0);
        let amount = 0.18 * falloff;
        if amount <= 0.001 {
            return frag.sample(slots::INPUT, uv);
        }

        let dir = Vec2::new(0.5 / aspect, 0.5) * amount * 0.4;
        let mut sum = Vec4::ZERO;
        for i in 1..=ITERATIONS {
            let th = i as f32 / ITERATIONS as f32;
            let r1 = rand01(uv + th + delta);
            let r2 = rand01(uv + th * 2.0 + delta);
            let r3 = rand01(uv + th * 3.0 + delta);
            let offset = Vec2::new(r1 * 2.0 - 1.0, r2 * 2.0 - 1.0) * mix(1.0, r3, 0.8);
            sum += frag.sample(slots::INPUT, uv + offset * dir);
        }
        sum / ITERATIONS as f32
    }
}
