//! Horizontal 36-tap Gaussian blur, scaled by distance from the pointer.

use glam::{Vec2, Vec4};

use super::{mix, slots, EffectBody, Fragment};
use crate::texture::TextureRef;
use crate::uniforms::{UniformError, UniformSet};

const WEIGHTS: [f32; 36] = [
    0.00094768, 0.00151965, 0.00237008, 0.00359517, 0.0053041, 0.00761097, 0.01062197, 0.01441804,
    0.01903459, 0.0244409, 0.03052299, 0.03707432, 0.04379813, 0.05032389, 0.05623791, 0.06112521,
    0.06461716, 0.06643724, 0.06643724, 0.06461716, 0.06112521, 0.05623791, 0.05032389, 0.04379813,
    0.03707432, 0.03052299, 0.0244409, 0.01903459, 0.01441804, 0.01062197, 0.00761097, 0.0053041,
    0.00359517, 0.00237008, 0.00151965, 0.00094768,
];

const SHADER: &str = r#"
fn ease_in_out(t: f32) -> f32 {
    if (t < 0.5) {
        return 2.0 * t * t;
    }
    return -1.0 + (4.0 - 2.0 * t) * t;
}

@fragment
fn fs(frag: VertexOutput) -> @location(0) vec4f {
    var weights = array<f32, 36>(
        0.00094768, 0.00151965, 0.00237008, 0.00359517, 0.0053041, 0.00761097,
        0.01062197, 0.01441804, 0.01903459, 0.0244409, 0.03052299, 0.03707432,
        0.04379813, 0.05032389, 0.05623791, 0.06112521, 0.06461716, 0.06643724,
        0.06643724, 0.06461716, 0.06112521, 0.05623791, 0.05032389, 0.04379813,
        0.03707432, 0.03052299, 0.0244409, 0.01903459, 0.01441804, 0.01062197,
        0.00761097, 0.0053041, 0.00359517, 0.00237008, 0.00151965, 0.00094768
    );

    let uv = frag.uv;
    let d = distance(uv, u.pointer);
    let falloff = ease_in_out(mix(d, max(0.0, 1.0 - d), 0.5));
    let radius = mix(0.0, 1.5, clamp(u.radius, 0.0, 1.0));
    let amount = 0.47 * 6.0 * falloff * radius;

    var color = sample_at(input_tex, input_samp, uv) * weights[0];
    for (var i = 0; i < 36; i++) {
        let x = f32(i - 18) * amount;
        color += sample_at(input_tex, input_samp, uv + vec2f(x * 0.0005, 0.0)) * weights[i];
    }
    return color;
}
"#;

/// Blur parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct BlurParams {
    /// Blur strength in `[0, 1]`.
    pub radius: f32,
}

impl Default for BlurParams {
    fn default() -> Self {
        Self { radius: 0.5 }
    }
}

impl BlurParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn uniforms(&self) -> UniformSet {
        UniformSet::new()
            .with(slots::RESOLUTION, Vec2::ONE)
            .with(slots::POINTER, Vec2::splat(0.5))
            .with("radius", self.radius)
            .with(slots::INPUT, TextureRef::Fallback)
    }

    pub fn apply(&self, set: &UniformSet) -> Result<(), UniformError> {
        set.set("radius", self.radius)
    }
}

fn ease_in_out(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        -1.0 + (4.0 - 2.0 * t) * t
    }
}

/// Gaussian blur along the horizontal axis.
pub struct Blur;

impl EffectBody for Blur {
    fn name(&self) -> &'static str {
        "blur"
    }

    fn fragment_source(&self) -> &'static str {
        SHADER
    }

    fn shade(&self, frag: &Fragment<'_>) -> Vec4 {
        let uv = frag.uv;
        let d = uv.distance(frag.vec2(slots::POINTER));
        let falloff = ease_in_out(mix(d, (1.0 - d).max(0.0), 0.5));
        let radius = mix(0.0, 1.5, frag.float("radius").clamp(0.0, 1.0));
        let amount = 0.47 * 6.0 * falloff * radius;

        let mut color = frag.sample(slots::INPUT, uv) * WEIGHTS[0];
        for (i, weight) in WEIGHTS.iter().enumerate() {
            let x = (i as f32 - 18.0) * amount;
            color += frag.sample(slots::INPUT, uv + Vec2::new(x * 0.0005, 0.0)) * *weight;
        }
        color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::test_support::{assert_valid_wgsl, shade_at, Flat};
    use crate::render_graph::Extent;

    #[test]
    fn wgsl_is_valid() {
        assert_valid_wgsl(&Blur, &BlurParams::default().uniforms());
    }

    #[test]
    fn kernel_is_normalized() {
        let total: f32 = WEIGHTS.iter().sum();
        assert!((total - 1.0).abs() < 1e-3, "{total}");
    }

    #[test]
    fn flat_input_gains_only_the_center_tap() {
        let color = Vec4::splat(0.5);
        let px = shade_at(
            &Blur,
            &BlurParams::default().uniforms(),
            &Flat(color),
            Vec2::new(0.2, 0.4),
            Extent::new(16, 16),
        );
        let expected = color * (WEIGHTS.iter().sum::<f32>() + WEIGHTS[0]);
        assert!((px - expected).abs().max_element() < 1e-5);
    }
}
