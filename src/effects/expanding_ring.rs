//! A ring that grows from a center point to the farthest corner, then restarts.

use glam::{Vec2, Vec4};

use super::{fract, luma, slots, smoothstep, EffectBody, Fragment};
use crate::color::Color;
use crate::uniforms::{UniformError, UniformSet};

const SHADER: &str = r#"
@fragment
fn fs(frag: VertexOutput) -> @location(0) vec4f {
    let aspect = u.resolution.x / max(u.resolution.y, 1.0);
    let scale = vec2f(aspect, 1.0);
    let uv = frag.uv * scale;
    let center = u.center * scale;

    var max_radius = 0.0;
    max_radius = max(max_radius, length(vec2f(0.0, 0.0) * scale - center));
    max_radius = max(max_radius, length(vec2f(1.0, 0.0) * scale - center));
    max_radius = max(max_radius, length(vec2f(0.0, 1.0) * scale - center));
    max_radius = max(max_radius, length(vec2f(1.0, 1.0) * scale - center));

    let phase = fract(u.time * u.speed);
    let ring_dist = abs(length(uv - center) - max_radius * phase);

    let line_radius = 0.5 * phase;
    var brightness = line_radius / (1.0 - smoothstep(0.2, 0.002, ring_dist + 0.02));
    brightness = brightness * max(0.0, 1.0 - phase);

    let ring = brightness * pow(max(1.0 - ring_dist, 0.0), 3.0) * u.color;
    let a = clamp(luma(ring) * u.alpha, 0.0, 1.0);
    return vec4f(ring, a);
}
"#;

/// Expanding ring parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpandingRingParams {
    pub color: Color,
    /// Ring origin in uv space.
    pub center: Vec2,
    /// Ring cycles per second.
    pub speed: f32,
    pub alpha: f32,
}

impl Default for ExpandingRingParams {
    fn default() -> Self {
        Self {
            color: Color::rgb(0.0, 0.505_882_35, 0.968_627_45),
            center: Vec2::splat(0.5),
            speed: 0.2,
            alpha: 1.0,
        }
    }
}

impl ExpandingRingParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color(mut self, color: impl Into<Color>) -> Self {
        self.color = color.into();
        self
    }

    pub fn center(mut self, center: Vec2) -> Self {
        self.center = center;
        self
    }

    pub fn speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn uniforms(&self) -> UniformSet {
        UniformSet::new()
            .with(slots::TIME, 0.0f32)
            .with(slots::RESOLUTION, Vec2::ONE)
            .with("center", self.center)
            .with("color", self.color.to_vec3())
            .with("speed", self.speed)
            .with("alpha", self.alpha)
    }

    pub fn apply(&self, set: &UniformSet) -> Result<(), UniformError> {
        set.set("center", self.center)?;
        set.set("color", self.color.to_vec3())?;
        set.set("speed", self.speed)?;
        set.set("alpha", self.alpha)
    }
}

/// Expanding ring generator. Reads no input texture.
pub struct ExpandingRing;

impl EffectBody for ExpandingRing {
    fn name(&self) -> &'static str {
        "expanding_ring"
    }

    fn fragment_source(&self) -> &'static str {
        SHADER
    }

    fn shade(&self, frag: &Fragment<'_>) -> Vec4 {
        let resolution = frag.vec2(slots::RESOLUTION);
        let scale = Vec2::new(resolution.x / resolution.y.max(1.0), 1.0);
        let uv = frag.uv * scale;
        let center = frag.vec2("center") * scale;

        let max_radius = [Vec2::ZERO, Vec2::X, Vec2::Y, Vec2::ONE]
            .iter()
            .map(|&c| (c * scale - center).length())
            .fold(0.0f32, f32::max);

        let phase = fract(frag.float(slots::TIME) * frag.float("speed"));
        let ring_dist = ((uv - center).length() - max_radius * phase).abs();

        let line_radius = 0.5 * phase;
        let brightness = line_radius / (1.0 - smoothstep(0.2, 0.002, ring_dist + 0.02))
            * (1.0 - phase).max(0.0);

        let ring = brightness * (1.0 - ring_dist).max(0.0).powi(3) * frag.vec3("color");
        let a = (luma(ring) * frag.float("alpha")).clamp(0.0, 1.0);
        ring.extend(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::test_support::{assert_valid_wgsl, shade_at, Flat};
    use crate::render_graph::Extent;

    #[test]
    fn wgsl_is_valid() {
        assert_valid_wgsl(&ExpandingRing, &ExpandingRingParams::default().uniforms());
    }

    #[test]
    fn ring_is_dark_at_phase_zero() {
        let uniforms = ExpandingRingParams::default().uniforms();
        uniforms.set(slots::RESOLUTION, Vec2::new(64.0, 64.0)).unwrap();
        let px = shade_at(
            &ExpandingRing,
            &uniforms,
            &Flat(Vec4::ZERO),
            Vec2::splat(0.5),
            Extent::new(64, 64),
        );
        assert_eq!(px, Vec4::ZERO);
    }

    #[test]
    fn ring_brightens_along_its_radius() {
        let uniforms = ExpandingRingParams::default().uniforms();
        uniforms.set(slots::RESOLUTION, Vec2::new(64.0, 64.0)).unwrap();
        // speed 0.2 at t = 1.25 puts the ring at a quarter of the max radius.
        uniforms.set(slots::TIME, 1.25f32).unwrap();
        let radius = 0.5f32.hypot(0.5) * 0.25;

        let sample = |uv: Vec2| {
            shade_at(&ExpandingRing, &uniforms, &Flat(Vec4::ZERO), uv, Extent::new(64, 64))
        };
        let on_ring = sample(Vec2::new(0.5 + radius, 0.5));
        let off_ring = sample(Vec2::new(0.95, 0.5));
        assert!(on_ring.z > off_ring.z);
    }
}
