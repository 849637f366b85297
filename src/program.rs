//! Shader programs: assembly, validation and compile errors.
//!
//! A pass program is assembled from three parts:
//!
//! 1. the shared vertex prelude ([`VERTEX_PRELUDE`]) and effect helpers
//!    ([`HELPERS_WGSL`]),
//! 2. a uniform block and texture bindings generated from the pass's
//!    [`UniformLayout`], and
//! 3. the effect body's fragment source, which must define `fs`.
//!
//! Texture slot `name` is exposed to WGSL as `name_tex` and `name_samp`.

use std::rc::Rc;

use crate::effects::{EffectBody, HELPERS_WGSL};
use crate::render_graph::quad::VERTEX_PRELUDE;
use crate::uniforms::UniformLayout;

/// Handle to a program compiled by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramId(pub(crate) u32);

/// How a pass's output is combined with the destination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlendMode {
    /// Overwrite the destination.
    #[default]
    Replace,
    /// Straight alpha blending over the destination.
    Normal,
}

impl BlendMode {
    pub(crate) fn to_wgpu(self) -> wgpu::BlendState {
        match self {
            BlendMode::Replace => wgpu::BlendState::REPLACE,
            BlendMode::Normal => wgpu::BlendState::ALPHA_BLENDING,
        }
    }
}

/// Everything a backend needs to build a program.
#[derive(Clone)]
pub struct ProgramDesc {
    pub label: String,
    pub effect: Rc<dyn EffectBody>,
    pub layout: UniformLayout,
    pub blend: BlendMode,
}

impl ProgramDesc {
    /// The complete WGSL module for this program.
    pub fn source(&self) -> String {
        assemble_source(&self.layout, self.effect.fragment_source())
    }
}

/// Errors that can occur while building a program.
#[derive(Debug, Clone)]
pub enum ShaderError {
    /// The WGSL source failed to parse.
    Parse { label: String, message: String },
    /// The module parsed but failed validation.
    Validation { label: String, message: String },
    /// The backend rejected the pipeline.
    Pipeline { label: String, message: String },
}

impl ShaderError {
    pub fn label(&self) -> &str {
        match self {
            ShaderError::Parse { label, .. }
            | ShaderError::Validation { label, .. }
            | ShaderError::Pipeline { label, .. } => label,
        }
    }
}

impl std::fmt::Display for ShaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderError::Parse { label, message } => {
                write!(f, "Shader '{}' failed to parse: {}", label, message)
            }
            ShaderError::Validation { label, message } => {
                write!(f, "Shader '{}' failed validation: {}", label, message)
            }
            ShaderError::Pipeline { label, message } => {
                write!(f, "Pipeline '{}' could not be created: {}", label, message)
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// Builds the full WGSL module for a layout and fragment body.
pub fn assemble_source(layout: &UniformLayout, fragment: &str) -> String {
    let mut source = String::from(VERTEX_PRELUDE);
    source.push_str(HELPERS_WGSL);
    source.push('\n');
    source.push_str(&layout.wgsl_struct("Uniforms"));
    source.push_str("\n@group(0) @binding(0) var<uniform> u: Uniforms;\n");
    for (i, name) in layout.texture_slots().iter().enumerate() {
        let binding = 1 + 2 * i;
        source.push_str(&format!(
            "@group(0) @binding({}) var {}_tex: texture_2d<f32>;\n",
            binding, name
        ));
        source.push_str(&format!(
            "@group(0) @binding({}) var {}_samp: sampler;\n",
            binding + 1,
            name
        ));
    }
    source.push('\n');
    source.push_str(fragment);
    source
}

/// Parses and validates WGSL with naga.
pub fn validate_wgsl(label: &str, source: &str) -> Result<naga::Module, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Parse {
        label: label.to_string(),
        message: e.emit_to_string(source),
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| ShaderError::Validation {
        label: label.to_string(),
        message: e.emit_to_string(source),
    })?;

    Ok(module)
}
