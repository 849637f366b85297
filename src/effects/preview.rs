//! Straight copy of the input, used to paint the final surface.

use glam::Vec4;

use super::{slots, EffectBody, Fragment};

const SHADER: &str = r#"
@fragment
fn fs(frag: VertexOutput) -> @location(0) vec4f {
    return sample_at(input_tex, input_samp, frag.uv);
}
"#;

pub struct Preview;

impl EffectBody for Preview {
    fn name(&self) -> &'static str {
        "preview"
    }

    fn fragment_source(&self) -> &'static str {
        SHADER
    }

    fn shade(&self, frag: &Fragment<'_>) -> Vec4 {
        frag.sample(slots::INPUT, frag.uv)
    }
}
