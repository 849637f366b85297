//! Rendering backends.
//!
//! A [`RenderBackend`] owns GPU (or CPU) resources and executes draw calls.
//! Passes never touch backend state directly; every [`DrawCall`] carries its
//! own destination, clear color and program, so nothing set by one pass can
//! leak into the next.
//!
//! Two backends are provided:
//!
//! - [`WgpuBackend`]: renders through wgpu into a window surface.
//! - [`SoftwareBackend`]: evaluates each effect's CPU reference on the host.
//!   Used for tests and headless rendering.

mod software;
mod wgpu_backend;

pub use software::{DrawRecord, Image, SoftwareBackend};
pub use wgpu_backend::WgpuBackend;

use image::RgbaImage;

use crate::color::Color;
use crate::program::{ProgramDesc, ProgramId, ShaderError};
use crate::render_graph::{Extent, TargetId};
use crate::texture::{AssetId, TextureFilter};
use crate::uniforms::UniformSet;

/// Where a draw writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Destination {
    /// An off-screen render target.
    Target(TargetId),
    /// The visible surface.
    Surface,
}

/// One full-screen draw.
#[derive(Clone, Copy)]
pub struct DrawCall<'a> {
    pub label: &'a str,
    pub program: ProgramId,
    pub uniforms: &'a UniformSet,
    pub destination: Destination,
    /// Clear the destination to this color before drawing.
    pub clear: Option<Color>,
}

/// Errors raised while recording or presenting a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameError {
    /// The surface could not provide a texture this frame.
    Surface(String),
    /// A draw was issued outside `begin_frame` / `end_frame`.
    NoActiveFrame,
    /// The draw referenced a program this backend did not compile.
    UnknownProgram(ProgramId),
    /// The draw's destination target has been released or never existed.
    UnknownTarget(TargetId),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::Surface(msg) => write!(f, "Surface unavailable: {}", msg),
            FrameError::NoActiveFrame => write!(f, "Draw issued outside of a frame"),
            FrameError::UnknownProgram(id) => write!(f, "Unknown program {:?}", id),
            FrameError::UnknownTarget(id) => write!(f, "Unknown render target {:?}", id),
        }
    }
}

impl std::error::Error for FrameError {}

/// Resource management and draw execution for one rendering device.
pub trait RenderBackend {
    /// Current size of the visible surface.
    fn surface_extent(&self) -> Extent;

    /// Resizes the visible surface. Zero sizes are ignored.
    fn resize_surface(&mut self, extent: Extent);

    /// Allocates an off-screen color target.
    fn create_target(&mut self, label: &str, extent: Extent) -> TargetId;

    /// Reallocates a target's storage at a new size, keeping its id.
    fn resize_target(&mut self, id: TargetId, extent: Extent);

    /// Frees a target. Its id is never reused.
    fn release_target(&mut self, id: TargetId);

    /// Size of a live target.
    fn target_extent(&self, id: TargetId) -> Option<Extent>;

    /// Uploads an RGBA8 image for sampling.
    fn upload_texture(&mut self, label: &str, image: &RgbaImage, filter: TextureFilter) -> AssetId;

    /// Frees an uploaded texture.
    fn release_texture(&mut self, id: AssetId);

    /// Builds a program. Failures are reported once here and never at draw time.
    fn compile(&mut self, desc: &ProgramDesc) -> Result<ProgramId, ShaderError>;

    /// Starts recording a frame.
    fn begin_frame(&mut self) -> Result<(), FrameError>;

    /// Records one full-screen draw.
    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), FrameError>;

    /// Submits the frame and presents the surface.
    fn end_frame(&mut self);
}
