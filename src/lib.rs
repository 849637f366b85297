//! # Shaderstack
//!
//! **Multi-pass fullscreen shader compositing with a pipeline that rewires itself.**
//!
//! Each effect is a fragment shader drawn over a full-screen quad into a
//! pooled render target. Passes run in priority order every frame, and the
//! optional stages of a scene can be switched on and off at runtime: every
//! consumer is re-pointed at the nearest enabled producer before the next
//! frame renders.
//!
//! ## Quick Start
//!
//! ```no_run
//! use shaderstack::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     env_logger::init();
//!     run(
//!         AppConfig::new()
//!             .title("Pulse Ring")
//!             .pulse_ring(PulseRingConfig::new().stage(StageId::Blur, true)),
//!     )?;
//!     Ok(())
//! }
//! ```
//!
//! ## Headless rendering
//!
//! Everything above the [`RenderBackend`] trait is backend-agnostic. The
//! [`SoftwareBackend`] shades on the CPU with the same effect bodies the GPU
//! programs are generated from, which is what the tests render with:
//!
//! ```no_run
//! use shaderstack::*;
//!
//! let extent = Extent::new(64, 64);
//! let mut backend = SoftwareBackend::new(extent);
//! let mut scene = PulseRing::mount(&mut backend, &PulseRingConfig::default());
//! scene.render(&mut backend, 1.0 / 60.0, extent).unwrap();
//! let pixel = backend.surface().pixel(32, 32);
//! ```

mod app;
pub mod backend;
mod clock;
mod color;
pub mod compositor;
pub mod effects;
mod gpu;
mod pointer;
mod program;
pub mod render_graph;
mod sprite;
mod texture;
mod uniforms;

pub use app::{AppConfig, SceneKind, run};
pub use backend::{
    Destination, DrawCall, FrameError, RenderBackend, SoftwareBackend, WgpuBackend,
};
pub use clock::{FrameClock, FrameTime};
pub use color::Color;
pub use compositor::{
    Compositor, EnabledStages, GlowingFrameScene, PipelineTopology, PulseRing, PulseRingConfig,
    RippleScene, SpriteSource, StageId,
};
pub use gpu::{GpuContext, GpuError};
pub use pointer::{PointerPhase, PointerTracker, SurfaceRect};
pub use program::{BlendMode, ProgramDesc, ProgramId, ShaderError};
pub use render_graph::{
    Extent, FrameContext, PassId, PassScheduler, ShaderPass, ShaderPassDescriptor, TargetId,
    TargetPool,
};
pub use sprite::{PendingSprite, SpriteError, SpriteSheet};
pub use texture::{AssetId, TextureFilter, TextureRef};
pub use uniforms::{UniformCell, UniformError, UniformKind, UniformSet, UniformValue};

// Re-export glam math types for convenience
pub use glam::{Vec2, Vec3, Vec4};
