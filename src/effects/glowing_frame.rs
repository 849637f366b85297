//! A self-contained glowing frame: two border glows and an expanding ring,
//! warped by value noise and finished with a 4x4 ordered halftone.

use glam::{Vec2, Vec3, Vec4};

use super::{fract, mix, rand01, slots, smoothstep, EffectBody, Fragment};
use crate::color::Color;
use crate::uniforms::{UniformError, UniformSet};

const SHADER: &str = r#"
fn frame_hash(p: vec2f) -> f32 {
    return fract(sin(dot(p, vec2f(127.1, 311.7))) * 43758.5453);
}

fn frame_noise(p: vec2f) -> f32 {
    let i = floor(p);
    var f = fract(p);
    f = f * f * (3.0 - 2.0 * f);
    let a = frame_hash(i);
    let b = frame_hash(i + vec2f(1.0, 0.0));
    let c = frame_hash(i + vec2f(0.0, 1.0));
    let d = frame_hash(i + vec2f(1.0, 1.0));
    return mix(mix(a, b, f.x), mix(c, d, f.x), f.y);
}

fn bayer4(cell: vec2u) -> f32 {
    var pattern = array<f32, 16>(
        0.0, 8.0, 2.0, 10.0,
        12.0, 4.0, 14.0, 6.0,
        3.0, 11.0, 1.0, 9.0,
        15.0, 7.0, 13.0, 5.0,
    );
    let m = cell % vec2u(4u);
    return pattern[m.x + m.y * 4u] / 16.0;
}

fn edge_distance(uv: vec2f) -> f32 {
    return min(min(uv.x, uv.y), min(1.0 - uv.x, 1.0 - uv.y));
}

fn border_glow(uv: vec2f, thickness: f32, intensity: f32) -> vec3f {
    let d = abs(edge_distance(uv));
    let glow = thickness / (1.0 - smoothstep(0.12, 0.01, d + 0.02));
    return glow * pow(1.0 - d, 3.0) * u.border_color * intensity;
}

fn ring_glow(uv: vec2f, aspect: f32) -> vec3f {
    let scale = vec2f(aspect, 1.0);
    let phase = fract(u.time * u.ring_speed);
    let ring_dist = abs(length(uv * scale - u.center * scale) - 1.1 * phase);
    var brightness = 0.5 * phase / (1.0 - smoothstep(0.2, 0.002, ring_dist + 0.02));
    brightness = brightness * max(0.0, 1.0 - phase);
    return brightness * pow(1.0 - ring_dist, 3.0) * u.ring_color;
}

@fragment
fn fs(frag: VertexOutput) -> @location(0) vec4f {
    let uv = frag.uv;
    let aspect = u.resolution.x / max(u.resolution.y, 1.0);

    let n = frame_noise(uv * 12.0 + vec2f(0.0, u.time * 0.0072));
    let warped = uv + (n - 0.5) * u.warp;

    var glow = border_glow(warped, 0.02, 1.0)
        + border_glow(warped, 0.08, 0.6)
        + ring_glow(warped, aspect);
    glow = tanh(clamp(glow, vec3f(-40.0), vec3f(40.0)));

    var color = abs(glow);
    color += vec3f(0.0, 0.05, 0.1) * (1.0 - smoothstep(0.0, 0.3, edge_distance(uv))) * 0.3;

    if (u.use_halftone != 0) {
        let threshold = bayer4(vec2u(floor(uv * u.resolution / 4.0))) * 0.5;
        let lum = dot(color, vec3f(0.2126, 0.7152, 0.0722));
        let dithered = mix(color * 0.5, color * 1.4, step(threshold, lum + 0.1));
        color = mix(color, dithered, 0.5);
    }

    color += vec3f((rand01(frag.clip_position.xy) - 0.5) / 255.0);
    return vec4f(color, 1.0);
}
"#;

const BAYER4: [f32; 16] = [
    0.0, 8.0, 2.0, 10.0, 12.0, 4.0, 14.0, 6.0, 3.0, 11.0, 1.0, 9.0, 15.0, 7.0, 13.0, 5.0,
];

/// Glowing frame parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct GlowingFrameParams {
    pub border_color: Color,
    pub ring_color: Color,
    /// Ring origin in uv space.
    pub center: Vec2,
    /// Ring cycles per second.
    pub ring_speed: f32,
    /// Noise displacement in uv units.
    pub warp: f32,
    /// Apply the ordered halftone.
    pub halftone: bool,
}

impl Default for GlowingFrameParams {
    fn default() -> Self {
        Self {
            border_color: Color::rgb(0.27, 0.604, 1.0),
            ring_color: Color::rgb(0.0, 0.506, 0.969),
            center: Vec2::splat(0.5),
            ring_speed: 0.02,
            warp: 0.01,
            halftone: true,
        }
    }
}

impl GlowingFrameParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn border_color(mut self, color: impl Into<Color>) -> Self {
        self.border_color = color.into();
        self
    }

    pub fn ring_color(mut self, color: impl Into<Color>) -> Self {
        self.ring_color = color.into();
        self
    }

    pub fn center(mut self, center: Vec2) -> Self {
        self.center = center;
        self
    }

    pub fn ring_speed(mut self, speed: f32) -> Self {
        self.ring_speed = speed;
        self
    }

    pub fn warp(mut self, warp: f32) -> Self {
        self.warp = warp;
        self
    }

    pub fn halftone(mut self, halftone: bool) -> Self {
        self.halftone = halftone;
        self
    }

    pub fn uniforms(&self) -> UniformSet {
        UniformSet::new()
            .with(slots::TIME, 0.0f32)
            .with(slots::RESOLUTION, Vec2::ONE)
            .with("border_color", self.border_color.to_vec3())
            .with("ring_color", self.ring_color.to_vec3())
            .with("center", self.center)
            .with("ring_speed", self.ring_speed)
            .with("warp", self.warp)
            .with("use_halftone", self.halftone)
    }

    pub fn apply(&self, set: &UniformSet) -> Result<(), UniformError> {
        set.set("border_color", self.border_color.to_vec3())?;
        set.set("ring_color", self.ring_color.to_vec3())?;
        set.set("center", self.center)?;
        set.set("ring_speed", self.ring_speed)?;
        set.set("warp", self.warp)?;
        set.set("use_halftone", self.halftone)
    }
}

fn hash(p: Vec2) -> f32 {
    fract((p.dot(Vec2::new(127.1, 311.7))).sin() * 43758.5453)
}

fn value_noise(p: Vec2) -> f32 {
    let i = p.floor();
    let f = p - i;
    let f = f * f * (Vec2::splat(3.0) - 2.0 * f);
    let a = hash(i);
    let b = hash(i + Vec2::X);
    let c = hash(i + Vec2::Y);
    let d = hash(i + Vec2::ONE);
    mix(mix(a, b, f.x), mix(c, d, f.x), f.y)
}

fn edge_distance(uv: Vec2) -> f32 {
    uv.x.min(uv.y).min((1.0 - uv.x).min(1.0 - uv.y))
}

/// Halftone threshold of a 4x4 pixel cell.
fn bayer4(cell: Vec2) -> f32 {
    let x = cell.x.rem_euclid(4.0) as usize;
    let y = cell.y.rem_euclid(4.0) as usize;
    BAYER4[x + y * 4] / 16.0
}

/// Border glow, expanding ring and halftone in one pass. Reads no input.
pub struct GlowingFrame;

impl GlowingFrame {
    fn border(frag: &Fragment<'_>, uv: Vec2, thickness: f32, intensity: f32) -> Vec3 {
        let d = edge_distance(uv).abs();
        let glow = thickness / (1.0 - smoothstep(0.12, 0.01, d + 0.02));
        glow * (1.0 - d).powi(3) * frag.vec3("border_color") * intensity
    }

    fn ring(frag: &Fragment<'_>, uv: Vec2, aspect: f32) -> Vec3 {
        let scale = Vec2::new(aspect, 1.0);
        let phase = fract(frag.float(slots::TIME) * frag.float("ring_speed"));
        let ring_dist = ((uv * scale - frag.vec2("center") * scale).length() - 1.1 * phase).abs();
        let brightness = 0.5 * phase / (1.0 - smoothstep(0.2, 0.002, ring_dist + 0.02))
            * (1.0 - phase).max(0.0);
        brightness * (1.0 - ring_dist).powi(3) * frag.vec3("ring_color")
    }
}

impl EffectBody for GlowingFrame {
    fn name(&self) -> &'static str {
        "glowing_frame"
    }

    fn fragment_source(&self) -> &'static str {
        SHADER
    }

    fn shade(&self, frag: &Fragment<'_>) -> Vec4 {
        let uv = frag.uv;
        let resolution = frag.vec2(slots::RESOLUTION);
        let aspect = resolution.x / resolution.y.max(1.0);

        let n = value_noise(uv * 12.0 + Vec2::new(0.0, frag.float(slots::TIME) * 0.0072));
        let warped = uv + Vec2::splat((n - 0.5) * frag.float("warp"));

        let glow = Self::border(frag, warped, 0.02, 1.0)
            + Self::border(frag, warped, 0.08, 0.6)
            + Self::ring(frag, warped, aspect);
        let glow = glow.clamp(Vec3::splat(-40.0), Vec3::splat(40.0));
        let glow = Vec3::from_array(glow.to_array().map(f32::tanh));

        let mut color = glow.abs();
        color += Vec3::new(0.0, 0.05, 0.1) * (1.0 - smoothstep(0.0, 0.3, edge_distance(uv))) * 0.3;

        if frag.flag("use_halftone") {
            let threshold = bayer4((uv * resolution / 4.0).floor()) * 0.5;
            let lum = color.dot(Vec3::new(0.2126, 0.7152, 0.0722));
            let lit = if lum + 0.1 >= threshold { 1.4 } else { 0.5 };
            color = color.lerp(color * lit, 0.5);
        }

        color += Vec3::splat((rand01(frag.coord) - 0.5) / 255.0);
        color.extend(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::test_support::{assert_valid_wgsl, shade_at, Flat};
    use crate::render_graph::Extent;

    fn uniforms(params: &GlowingFrameParams, time: f32) -> UniformSet {
        let set = params.uniforms();
        set.set(slots::RESOLUTION, Vec2::new(64.0, 64.0)).unwrap();
        set.set(slots::TIME, time).unwrap();
        set
    }

    #[test]
    fn wgsl_is_valid() {
        assert_valid_wgsl(&GlowingFrame, &GlowingFrameParams::default().uniforms());
    }

    #[test]
    fn frame_edges_outshine_the_center() {
        let set = uniforms(&GlowingFrameParams::default().halftone(false), 0.0);
        let extent = Extent::new(64, 64);
        let edge = shade_at(&GlowingFrame, &set, &Flat(Vec4::ZERO), Vec2::new(0.02, 0.5), extent);
        let center = shade_at(&GlowingFrame, &set, &Flat(Vec4::ZERO), Vec2::splat(0.5), extent);
        assert!(edge.z > center.z);
        assert_eq!(edge.w, 1.0);
        assert_eq!(center.w, 1.0);
    }

    #[test]
    fn ring_lights_up_its_radius() {
        // Phase 0.25 puts the ring 0.275 from the center.
        let params = GlowingFrameParams::default().halftone(false).warp(0.0);
        let set = uniforms(&params, 12.5);
        let extent = Extent::new(64, 64);
        let black = Flat(Vec4::ZERO);
        let on_ring = shade_at(&GlowingFrame, &set, &black, Vec2::new(0.775, 0.5), extent);
        let inside = shade_at(&GlowingFrame, &set, &black, Vec2::new(0.6, 0.5), extent);
        assert!(on_ring.z > inside.z);
    }

    #[test]
    fn halftone_pattern_covers_sixteen_levels() {
        let mut levels: Vec<f32> = (0..4)
            .flat_map(|y| (0..4).map(move |x| bayer4(Vec2::new(x as f32, y as f32))))
            .collect();
        levels.sort_by(f32::total_cmp);
        let expected: Vec<f32> = (0..16).map(|i| i as f32 / 16.0).collect();
        assert_eq!(levels, expected);
        assert_eq!(bayer4(Vec2::new(5.0, 0.0)), bayer4(Vec2::new(1.0, 0.0)));
    }

    #[test]
    fn apply_updates_cells_in_place() {
        let set = GlowingFrameParams::default().uniforms();
        let cell = set.cell("ring_speed").unwrap().clone();
        GlowingFrameParams::new().ring_speed(0.5).apply(&set).unwrap();
        assert_eq!(cell.get().as_float(), Some(0.5));
    }
}
