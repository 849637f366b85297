//! Concentric ripples with a diagonal wave, painted straight to the surface.

use glam::{Vec2, Vec3, Vec4};

use super::{slots, smoothstep, EffectBody, Fragment};
use crate::color::Color;
use crate::uniforms::{UniformError, UniformSet};

const SHADER: &str = r#"
@fragment
fn fs(frag: VertexOutput) -> @location(0) vec4f {
    var uv = frag.uv - 0.5;
    uv.x = uv.x * (u.resolution.x / max(u.resolution.y, 1.0));
    uv = uv * u.zoom;

    let t = u.time * u.speed;
    let rings = sin(length(uv) * 8.0 - t * 1.5);
    let waves = sin((uv.x + uv.y) * 6.0 + t * 0.9);
    let glow = smoothstep(0.0, 1.0, rings * 0.5 + 0.5);

    var base = mix(vec3f(0.05, 0.1, 0.2), vec3f(0.35, 0.8, 0.9), glow);
    if (u.has_palette != 0) {
        base = mix(u.palette_a, u.palette_b, glow);
    }
    let color = (base + waves * 0.12) * u.intensity;
    return vec4f(color, 1.0);
}
"#;

const DEFAULT_LOW: Vec3 = Vec3::new(0.05, 0.1, 0.2);
const DEFAULT_HIGH: Vec3 = Vec3::new(0.35, 0.8, 0.9);

/// Ripple wave parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct RippleWaveParams {
    pub intensity: f32,
    pub zoom: f32,
    pub speed: f32,
    /// Trough and crest colors; `None` uses the built-in blue ramp.
    pub palette: Option<(Color, Color)>,
    /// Clear the surface to the scene background before drawing.
    pub clear: bool,
}

impl Default for RippleWaveParams {
    fn default() -> Self {
        Self {
            intensity: 0.85,
            zoom: 1.2,
            speed: 0.9,
            palette: None,
            clear: true,
        }
    }
}

impl RippleWaveParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn zoom(mut self, zoom: f32) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn clear(mut self, clear: bool) -> Self {
        self.clear = clear;
        self
    }

    /// Builds the palette from a list of hex colors.
    ///
    /// The first half (rounded up) is averaged into the trough color, the rest
    /// into the crest color. A single color is used for both. Entries that fail
    /// to parse are skipped; an empty or fully invalid list clears the palette.
    pub fn hex_colors<S: AsRef<str>>(mut self, hex: &[S]) -> Self {
        let colors: Vec<Color> = hex.iter().filter_map(|h| Color::from_hex(h.as_ref())).collect();
        if colors.len() != hex.len() {
            log::warn!(
                "Ignored {} invalid palette colors",
                hex.len() - colors.len()
            );
        }
        self.palette = palette_from(&colors);
        self
    }

    pub fn uniforms(&self) -> UniformSet {
        let (a, b) = self.palette_vecs();
        UniformSet::new()
            .with(slots::TIME, 0.0f32)
            .with(slots::RESOLUTION, Vec2::ONE)
            .with("intensity", self.intensity)
            .with("zoom", self.zoom)
            .with("speed", self.speed)
            .with("palette_a", a)
            .with("palette_b", b)
            .with("has_palette", self.palette.is_some())
    }

    pub fn apply(&self, set: &UniformSet) -> Result<(), UniformError> {
        let (a, b) = self.palette_vecs();
        set.set("intensity", self.intensity)?;
        set.set("zoom", self.zoom)?;
        set.set("speed", self.speed)?;
        set.set("palette_a", a)?;
        set.set("palette_b", b)?;
        set.set("has_palette", self.palette.is_some())
    }

    fn palette_vecs(&self) -> (Vec3, Vec3) {
        self.palette
            .map(|(a, b)| (a.to_vec3(), b.to_vec3()))
            .unwrap_or((Vec3::ZERO, Vec3::ZERO))
    }
}

fn average(colors: &[Color]) -> Color {
    let sum: Vec3 = colors.iter().map(|c| c.to_vec3()).sum();
    Color::from(sum / colors.len().max(1) as f32)
}

fn palette_from(colors: &[Color]) -> Option<(Color, Color)> {
    if colors.is_empty() {
        return None;
    }
    let (first, second) = colors.split_at(colors.len().div_ceil(2));
    let a = average(first);
    let b = if second.is_empty() { a } else { average(second) };
    Some((a, b))
}

/// Ripple wave generator. Reads no input texture.
pub struct RippleWave;

impl EffectBody for RippleWave {
    fn name(&self) -> &'static str {
        "ripple_wave"
    }

    fn fragment_source(&self) -> &'static str {
        SHADER
    }

    fn shade(&self, frag: &Fragment<'_>) -> Vec4 {
        let resolution = frag.vec2(slots::RESOLUTION);
        let mut uv = frag.uv - 0.5;
        uv.x *= resolution.x / resolution.y.max(1.0);
        uv *= frag.float("zoom");

        let t = frag.float(slots::TIME) * frag.float("speed");
        let rings = (uv.length() * 8.0 - t * 1.5).sin();
        let waves = ((uv.x + uv.y) * 6.0 + t * 0.9).sin();
        let glow = smoothstep(0.0, 1.0, rings * 0.5 + 0.5);

        let base = if frag.flag("has_palette") {
            frag.vec3("palette_a").lerp(frag.vec3("palette_b"), glow)
        } else {
            DEFAULT_LOW.lerp(DEFAULT_HIGH, glow)
        };
        ((base + Vec3::splat(waves * 0.12)) * frag.float("intensity")).extend(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::test_support::{assert_valid_wgsl, shade_at, Flat};
    use crate::render_graph::Extent;

    #[test]
    fn wgsl_is_valid() {
        assert_valid_wgsl(&RippleWave, &RippleWaveParams::default().uniforms());
    }

    #[test]
    fn palette_averages_each_half() {
        let params = RippleWaveParams::new().hex_colors(&["#ff0000", "#0000ff", "#00ff00"]);
        let (a, b) = params.palette.unwrap();
        assert!((a.to_vec3() - Vec3::new(0.5, 0.0, 0.5)).abs().max_element() < 1e-6);
        assert!((b.to_vec3() - Vec3::new(0.0, 1.0, 0.0)).abs().max_element() < 1e-6);
    }

    #[test]
    fn single_color_fills_both_ends() {
        let params = RippleWaveParams::new().hex_colors(&["#336699"]);
        let (a, b) = params.palette.unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_palette_falls_back_to_default_ramp() {
        let params = RippleWaveParams::new().hex_colors::<&str>(&[]);
        assert!(params.palette.is_none());
        assert_eq!(params.uniforms().get("has_palette").and_then(|v| v.as_int()), Some(0));
    }

    #[test]
    fn output_is_opaque() {
        let uniforms = RippleWaveParams::default().uniforms();
        uniforms.set(slots::RESOLUTION, Vec2::new(32.0, 16.0)).unwrap();
        uniforms.set(slots::TIME, 3.0f32).unwrap();
        let px = shade_at(
            &RippleWave,
            &uniforms,
            &Flat(Vec4::ZERO),
            Vec2::new(0.25, 0.75),
            Extent::new(32, 16),
        );
        assert_eq!(px.w, 1.0);
    }
}
