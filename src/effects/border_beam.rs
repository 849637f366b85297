//! Glowing beam along the viewport edges.

use glam::{Vec3, Vec4};

use super::{luma, rand01, smoothstep, EffectBody, Fragment};
use crate::color::Color;
use crate::uniforms::{UniformError, UniformSet};

const SHADER: &str = r#"
fn tonemap_tanh(x_in: vec3f) -> vec3f {
    let x = clamp(x_in, vec3f(-40.0), vec3f(40.0));
    return (exp(x) - exp(-x)) / (exp(x) + exp(-x));
}

@fragment
fn fs(frag: VertexOutput) -> @location(0) vec4f {
    let uv = frag.uv;
    let sdf = min(min(uv.x, uv.y), min(1.0 - uv.x, 1.0 - uv.y));
    let glow = u.thickness / (1.0 - smoothstep(0.12, 0.01, abs(sdf) + 0.02));
    var beam = glow * pow(1.0 - abs(sdf), 3.0) * u.color * u.intensity;
    if (u.use_tonemap != 0) {
        beam = tonemap_tanh(beam);
    }

    let a = clamp(luma(beam) * u.alpha, 0.0, 1.0);

    if (u.use_dither != 0) {
        let d = (rand01(frag.clip_position.xy) - 0.5) * u.dither_strength;
        beam = beam + vec3f(d);
    }
    return vec4f(beam, a);
}
"#;

/// Border glow parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct BorderBeamParams {
    /// Glow thickness in uv units.
    pub thickness: f32,
    pub intensity: f32,
    pub color: Color,
    /// Add a small hash-based dither to hide banding.
    pub dither: bool,
    pub dither_strength: f32,
    /// Compress the glow with a tanh curve.
    pub tonemap: bool,
    /// Multiplier on the output alpha.
    pub alpha: f32,
}

impl Default for BorderBeamParams {
    fn default() -> Self {
        Self {
            thickness: 0.02,
            intensity: 1.0,
            color: Color::rgb(0.270_588_24, 0.603_921_6, 1.0),
            dither: true,
            dither_strength: 1.0 / 128.0,
            tonemap: true,
            alpha: 1.0,
        }
    }
}

impl BorderBeamParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thickness(mut self, thickness: f32) -> Self {
        self.thickness = thickness;
        self
    }

    pub fn intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn color(mut self, color: impl Into<Color>) -> Self {
        self.color = color.into();
        self
    }

    pub fn dither(mut self, dither: bool, strength: f32) -> Self {
        self.dither = dither;
        self.dither_strength = strength;
        self
    }

    pub fn tonemap(mut self, tonemap: bool) -> Self {
        self.tonemap = tonemap;
        self
    }

    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// A fresh uniform set holding these parameters.
    pub fn uniforms(&self) -> UniformSet {
        UniformSet::new()
            .with("thickness", self.thickness)
            .with("intensity", self.intensity)
            .with("color", self.color.to_vec3())
            .with("alpha", self.alpha)
            .with("use_dither", self.dither)
            .with("dither_strength", self.dither_strength)
            .with("use_tonemap", self.tonemap)
    }

    /// Writes these parameters into an existing set in place.
    pub fn apply(&self, set: &UniformSet) -> Result<(), UniformError> {
        set.set("thickness", self.thickness)?;
        set.set("intensity", self.intensity)?;
        set.set("color", self.color.to_vec3())?;
        set.set("alpha", self.alpha)?;
        set.set("use_dither", self.dither)?;
        set.set("dither_strength", self.dither_strength)?;
        set.set("use_tonemap", self.tonemap)
    }
}

fn tonemap_tanh(x: Vec3) -> Vec3 {
    let x = x.clamp(Vec3::splat(-40.0), Vec3::splat(40.0));
    let (p, n) = (x.exp(), (-x).exp());
    (p - n) / (p + n)
}

/// Edge glow generator. Reads no input texture.
pub struct BorderBeam;

impl EffectBody for BorderBeam {
    fn name(&self) -> &'static str {
        "border_beam"
    }

    fn fragment_source(&self) -> &'static str {
        SHADER
    }

    fn shade(&self, frag: &Fragment<'_>) -> Vec4 {
        let uv = frag.uv;
        let sdf = uv.x.min(uv.y).min((1.0 - uv.x).min(1.0 - uv.y));
        let glow = frag.float("thickness") / (1.0 - smoothstep(0.12, 0.01, sdf.abs() + 0.02));
        let mut beam =
            glow * (1.0 - sdf.abs()).powi(3) * frag.vec3("color") * frag.float("intensity");
        if frag.flag("use_tonemap") {
            beam = tonemap_tanh(beam);
        }

        let a = (luma(beam) * frag.float("alpha")).clamp(0.0, 1.0);

        if frag.flag("use_dither") {
            let d = (rand01(frag.coord) - 0.5) * frag.float("dither_strength");
            beam += Vec3::splat(d);
        }
        beam.extend(a)
    }
}
