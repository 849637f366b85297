//! The full-screen quad shared by every pass.

/// A vertex of the full-screen quad.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    /// Clip-space position.
    pub position: [f32; 2],
    /// Texture coordinate with the origin at the bottom-left corner.
    pub uv: [f32; 2],
}

impl QuadVertex {
    const fn new(x: f32, y: f32) -> Self {
        Self {
            position: [x, y],
            uv: [x * 0.5 + 0.5, y * 0.5 + 0.5],
        }
    }

    /// Vertex buffer layout matching `@location(0)` position and `@location(1)` uv.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Two counter-clockwise triangles covering clip space.
pub const FULLSCREEN_QUAD: [QuadVertex; 6] = [
    QuadVertex::new(-1.0, -1.0),
    QuadVertex::new(1.0, -1.0),
    QuadVertex::new(1.0, 1.0),
    QuadVertex::new(-1.0, -1.0),
    QuadVertex::new(1.0, 1.0),
    QuadVertex::new(-1.0, 1.0),
];

/// Vertex stage and helpers prepended to every pass program.
///
/// `tex_uv` converts a bottom-left-origin uv into texture space, and
/// `sample_at` samples without implicit derivatives so it may run in any
/// control flow.
pub const VERTEX_PRELUDE: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4f,
    @location(0) uv: vec2f,
}

@vertex
fn vs(@location(0) position: vec2f, @location(1) uv: vec2f) -> VertexOutput {
    var output: VertexOutput;
    output.clip_position = vec4f(position, 0.0, 1.0);
    output.uv = uv;
    return output;
}

fn tex_uv(uv: vec2f) -> vec2f {
    return vec2f(uv.x, 1.0 - uv.y);
}

fn sample_at(t: texture_2d<f32>, s: sampler, uv: vec2f) -> vec4f {
    return textureSampleLevel(t, s, tex_uv(uv), 0.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_covers_clip_space() {
        let xs: Vec<f32> = FULLSCREEN_QUAD.iter().map(|v| v.position[0]).collect();
        let ys: Vec<f32> = FULLSCREEN_QUAD.iter().map(|v| v.position[1]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), -1.0);
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 1.0);
        assert_eq!(ys.iter().cloned().fold(f32::MAX, f32::min), -1.0);
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 1.0);
    }

    #[test]
    fn uv_origin_is_bottom_left() {
        assert_eq!(FULLSCREEN_QUAD[0].uv, [0.0, 0.0]);
        assert_eq!(FULLSCREEN_QUAD[2].uv, [1.0, 1.0]);
    }
}
