use glam::Vec4;

use super::{EffectBody, Fragment};

const SHADER: &str = r#"
@fragment
fn fs(frag: VertexOutput) -> @location(0) vec4f {
    return u.color;
}
"#;

/// Fills the destination with the `color` uniform.
pub struct Solid;

impl EffectBody for Solid {
    fn name(&self) -> &'static str {
        "solid"
    }

    fn fragment_source(&self) -> &'static str {
        SHADER
    }

    fn shade(&self, frag: &Fragment<'_>) -> Vec4 {
        frag.vec4("color")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::effects::test_support::assert_valid_wgsl;
    use crate::uniforms::UniformSet;

    #[test]
    fn wgsl_is_valid() {
        assert_valid_wgsl(&Solid, &UniformSet::new().with("color", Color::WHITE));
    }
}
