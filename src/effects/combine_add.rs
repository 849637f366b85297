//! Additive merge of two inputs.

use glam::Vec4;

use super::{EffectBody, Fragment};

const SHADER: &str = r#"
@fragment
fn fs(frag: VertexOutput) -> @location(0) vec4f {
    let a = sample_at(input_a_tex, input_a_samp, frag.uv);
    let b = sample_at(input_b_tex, input_b_samp, frag.uv);
    return vec4f(a.rgb + b.rgb, clamp(a.a + b.a, 0.0, 1.0));
}
"#;

/// Adds the colors of two inputs; alpha saturates at one.
pub struct CombineAdd;

impl CombineAdd {
    /// First input slot.
    pub const INPUT_A: &'static str = "input_a";
    /// Second input slot.
    pub const INPUT_B: &'static str = "input_b";
}

impl EffectBody for CombineAdd {
    fn name(&self) -> &'static str {
        "combine_add"
    }

    fn fragment_source(&self) -> &'static str {
        SHADER
    }

    fn shade(&self, frag: &Fragment<'_>) -> Vec4 {
        let a = frag.sample(Self::INPUT_A, frag.uv);
        let b = frag.sample(Self::INPUT_B, frag.uv);
        (a.truncate() + b.truncate()).extend((a.w + b.w).clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::test_support::{assert_valid_wgsl, shade_at, Flat};
    use crate::render_graph::Extent;
    use crate::texture::TextureRef;
    use crate::uniforms::UniformSet;
    use glam::Vec2;

    fn uniforms() -> UniformSet {
        UniformSet::new()
            .with(CombineAdd::INPUT_A, TextureRef::Fallback)
            .with(CombineAdd::INPUT_B, TextureRef::Fallback)
    }

    #[test]
    fn wgsl_is_valid() {
        assert_valid_wgsl(&CombineAdd, &uniforms());
    }

    #[test]
    fn sums_color_and_saturates_alpha() {
        let px = shade_at(
            &CombineAdd,
            &uniforms(),
            &Flat(Vec4::new(0.2, 0.1, 0.0, 0.75)),
            Vec2::splat(0.5),
            Extent::UNIT,
        );
        assert!((px - Vec4::new(0.4, 0.2, 0.0, 1.0)).abs().max_element() < 1e-6);
    }
}
