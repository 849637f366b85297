//! Value-noise displacement around the pointer.

use glam::{Vec2, Vec4};

use super::{rand01, slots, smoothstep, EffectBody, Fragment};
use crate::texture::TextureRef;
use crate::uniforms::{UniformError, UniformSet};

const SHADER: &str = r#"
fn value_noise(p: vec2f) -> f32 {
    let i = floor(p);
    let f = fract(p);
    let w = f * f * (3.0 - 2.0 * f);
    let a = rand01(i);
    let b = rand01(i + vec2f(1.0, 0.0));
    let c = rand01(i + vec2f(0.0, 1.0));
    let d = rand01(i + vec2f(1.0, 1.0));
    return mix(mix(a, b, w.x), mix(c, d, w.x), w.y);
}

@fragment
fn fs(frag: VertexOutput) -> @location(0) vec4f {
    let aspect = u.resolution.x / max(u.resolution.y, 1.0);
    let scale = vec2f(aspect, 1.0);
    let dist = distance(frag.uv * scale, u.pointer * scale);
    let falloff = 1.0 - smoothstep(0.0, max(u.radius, 0.0001), dist);

    let t = u.time * u.speed;
    let p = frag.uv * u.scale;
    let n = vec2f(value_noise(p + vec2f(t, 0.0)), value_noise(p + vec2f(17.0, t)));
    let warped = frag.uv + (n - 0.5) * (u.strength * 0.1 * falloff);
    return sample_at(input_tex, input_samp, warped);
}
"#;

/// Noise warp parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseWarpParams {
    /// Radius of the warped region around the pointer, in uv units.
    pub radius: f32,
    /// Displacement strength; 1.0 shifts by up to 5% of the frame.
    pub strength: f32,
    /// Noise frequency.
    pub scale: f32,
    /// Noise scroll speed.
    pub speed: f32,
}

impl Default for NoiseWarpParams {
    fn default() -> Self {
        Self {
            radius: 0.35,
            strength: 0.5,
            scale: 6.0,
            speed: 0.4,
        }
    }
}

impl NoiseWarpParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn strength(mut self, strength: f32) -> Self {
        self.strength = strength;
        self
    }

    pub fn uniforms(&self) -> UniformSet {
        UniformSet::new()
            .with(slots::TIME, 0.0f32)
            .with(slots::RESOLUTION, Vec2::ONE)
            .with(slots::POINTER, Vec2::splat(0.5))
            .with("radius", self.radius)
            .with("strength", self.strength)
            .with("scale", self.scale)
            .with("speed", self.speed)
            .with(slots::INPUT, TextureRef::Fallback)
    }

    pub fn apply(&self, set: &UniformSet) -> Result<(), UniformError> {
        set.set("radius", self.radius)?;
        set.set("strength", self.strength)?;
        set.set("scale", self.scale)?;
        set.set("speed", self.speed)
    }
}

fn value_noise(p: Vec2) -> f32 {
    let i = p.floor();
    let f = p - i;
    let w = f * f * (Vec2::splat(3.0) - 2.0 * f);
    let a = rand01(i);
    let b = rand01(i + Vec2::X);
    let c = rand01(i + Vec2::Y);
    let d = rand01(i + Vec2::ONE);
    let top = a + (b - a) * w.x;
    let bottom = c + (d - c) * w.x;
    top + (bottom - top) * w.y
}

/// Displaces input lookups with scrolling value noise, strongest at the pointer.
pub struct NoiseWarp;

impl EffectBody for NoiseWarp {
    fn name(&self) -> &'static str {
        "noise_warp"
    }

    fn fragment_source(&self) -> &'static str {
        SHADER
    }

    fn shade(&self, frag: &Fragment<'_>) -> Vec4 {
        let resolution = frag.vec2(slots::RESOLUTION);
        let scale = Vec2::new(resolution.x / resolution.y.max(1.0), 1.0);
        let dist = (frag.uv * scale).distance(frag.vec2(slots::POINTER) * scale);
        let falloff = 1.0 - smoothstep(0.0, frag.float("radius").max(0.0001), dist);

        let t = frag.float(slots::TIME) * frag.float("speed");
        let p = frag.uv * frag.float("scale");
        let n = Vec2::new(
            value_noise(p + Vec2::new(t, 0.0)),
            value_noise(p + Vec2::new(17.0, t)),
        );
        let warped = frag.uv + (n - 0.5) * (frag.float("strength") * 0.1 * falloff);
        frag.sample(slots::INPUT, warped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::test_support::{assert_valid_wgsl, shade_at, Flat};
    use crate::render_graph::Extent;

    #[test]
    fn wgsl_is_valid() {
        assert_valid_wgsl(&NoiseWarp, &NoiseWarpParams::default().uniforms());
    }

    #[test]
    fn flat_input_stays_flat() {
        let color = Vec4::new(0.3, 0.6, 0.9, 1.0);
        let uniforms = NoiseWarpParams::default().strength(4.0).uniforms();
        for uv in [Vec2::splat(0.5), Vec2::new(0.1, 0.8)] {
            let px = shade_at(&NoiseWarp, &uniforms, &Flat(color), uv, Extent::new(32, 32));
            assert_eq!(px, color);
        }
    }

    #[test]
    fn noise_is_bounded() {
        for i in 0..32 {
            let n = value_noise(Vec2::new(i as f32 * 0.41, i as f32 * 0.77));
            assert!((0.0..=1.0).contains(&n));
        }
    }
}
