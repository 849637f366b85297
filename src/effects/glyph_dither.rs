//! Luminance-driven glyph dithering.
//!
//! The input is pixelated into a grid of cells. Each cell's luminance picks a
//! glyph from a sprite strip, and the glyph masks the cell color before it is
//! blended back over the unpixelated input.

use glam::{Vec2, Vec3, Vec4};

use super::{mix, slots, smoothstep, EffectBody, Fragment};
use crate::texture::TextureRef;
use crate::uniforms::{UniformError, UniformSet};

const SHADER: &str = r#"
fn wrap(x: vec2f, y: vec2f) -> vec2f {
    return x - y * floor(x / y);
}

@fragment
fn fs(frag: VertexOutput) -> @location(0) vec4f {
    let uv = frag.uv;
    let pos = u.pointer;
    let aspect = u.resolution.x / max(u.resolution.y, 1.0);
    let correction = mix(aspect, 1.0 / aspect, 0.5);
    let cell_size = vec2f(u.grid_size / aspect, u.grid_size) * correction;
    let cell = floor((uv - pos) / cell_size);
    let pixelated = (cell + 0.5) * cell_size + pos;

    let bg = sample_at(input_tex, input_samp, uv);
    let color = sample_at(input_tex, input_samp, pixelated);
    let lum = dot(color.rgb, vec3f(0.2126, 0.7152, 0.0722));
    let gamma = pow(mix(0.2, 2.2, u.gamma), 2.2);

    let sprite_size = vec2f(textureDimensions(sprite_tex));
    let glyph_height = sprite_size.y;
    let count = max(1.0, sprite_size.x / glyph_height);
    let index = clamp(floor(lum * count), 0.0, count - 1.0);
    let gamma_index = clamp(floor(lum * count * gamma), 0.0, count - 1.0);

    let inset = 0.5 / glyph_height;
    let local = clamp(wrap(uv - pos, cell_size) / cell_size, vec2f(inset), vec2f(1.0 - inset));
    let glyph = sample_at(sprite_tex, sprite_samp, vec2f((gamma_index + local.x) / count, local.y));
    let alpha = smoothstep(0.0, 1.0, glyph.r);

    let shaded = (color.rgb - index * 0.04) * 1.4;
    let dithered = mix(vec3f(0.0), shaded, alpha);
    return vec4f(mix(bg.rgb, dithered, u.opacity), color.a);
}
"#;

/// Glyph dither parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphDitherParams {
    /// Cell height in uv units.
    pub grid_size: f32,
    /// Gamma control in `[0, 1]`, mapped to an exponent between 0.2 and 2.2.
    pub gamma: f32,
    /// Weight of the dithered layer over the input.
    pub opacity: f32,
}

impl Default for GlyphDitherParams {
    fn default() -> Self {
        Self {
            grid_size: 0.005,
            gamma: 0.58,
            opacity: 0.5,
        }
    }
}

impl GlyphDitherParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid_size(mut self, grid_size: f32) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn uniforms(&self) -> UniformSet {
        UniformSet::new()
            .with(slots::RESOLUTION, Vec2::ONE)
            .with(slots::POINTER, Vec2::splat(0.5))
            .with("grid_size", self.grid_size)
            .with("gamma", self.gamma)
            .with("opacity", self.opacity)
            .with(slots::INPUT, TextureRef::Fallback)
            .with(GlyphDither::SPRITE, TextureRef::Fallback)
    }

    pub fn apply(&self, set: &UniformSet) -> Result<(), UniformError> {
        set.set("grid_size", self.grid_size)?;
        set.set("gamma", self.gamma)?;
        set.set("opacity", self.opacity)
    }
}

fn wrap(x: Vec2, y: Vec2) -> Vec2 {
    x - y * (x / y).floor()
}

/// Replaces input cells with glyphs chosen by luminance.
pub struct GlyphDither;

impl GlyphDither {
    /// Sprite strip slot.
    pub const SPRITE: &'static str = "sprite";
}

impl EffectBody for GlyphDither {
    fn name(&self) -> &'static str {
        "glyph_dither"
    }

    fn fragment_source(&self) -> &'static str {
        SHADER
    }

    fn shade(&self, frag: &Fragment<'_>) -> Vec4 {
        let uv = frag.uv;
        let pos = frag.vec2(slots::POINTER);
        let resolution = frag.vec2(slots::RESOLUTION);
        let aspect = resolution.x / resolution.y.max(1.0);
        let correction = mix(aspect, 1.0 / aspect, 0.5);
        let grid = frag.float("grid_size");
        let cell_size = Vec2::new(grid / aspect, grid) * correction;
        let cell = ((uv - pos) / cell_size).floor();
        let pixelated = (cell + 0.5) * cell_size + pos;

        let bg = frag.sample(slots::INPUT, uv);
        let color = frag.sample(slots::INPUT, pixelated);
        let lum = color.truncate().dot(Vec3::new(0.2126, 0.7152, 0.0722));
        let gamma = mix(0.2, 2.2, frag.float("gamma")).powf(2.2);

        let sprite_size = frag.texture_size(Self::SPRITE);
        let glyph_height = sprite_size.y;
        let count = (sprite_size.x / glyph_height).max(1.0);
        let index = (lum * count).floor().clamp(0.0, count - 1.0);
        let gamma_index = (lum * count * gamma).floor().clamp(0.0, count - 1.0);

        let inset = 0.5 / glyph_height;
        let local = (wrap(uv - pos, cell_size) / cell_size)
            .clamp(Vec2::splat(inset), Vec2::splat(1.0 - inset));
        let glyph = frag.sample(
            Self::SPRITE,
            Vec2::new((gamma_index + local.x) / count, local.y),
        );
        let alpha = smoothstep(0.0, 1.0, glyph.x);

        let shaded = (color.truncate() - Vec3::splat(index * 0.04)) * 1.4;
        let dithered = shaded * alpha;
        bg.truncate()
            .lerp(dithered, frag.float("opacity"))
            .extend(color.w)
    }
}
