//! Pass-based render graph for multi-pass compositing.
//!
//! The graph is a flat list of [`ShaderPass`]es run by a [`PassScheduler`] in
//! ascending priority. Each pass draws one full-screen quad from at most one
//! input texture into either an off-screen target or the visible surface:
//!
//! ```text
//! ┌────────────┐    ┌────────────┐
//! │ Generator  │───▶│  Target A  │──┐
//! └────────────┘    └────────────┘  │    ┌────────────┐    ┌─────────┐
//!                                   ├───▶│  Combine   │───▶│ Target C│──▶ … ──▶ Surface
//! ┌────────────┐    ┌────────────┐  │    └────────────┘    └─────────┘
//! │ Generator  │───▶│  Target B  │──┘
//! └────────────┘    └────────────┘
//! ```
//!
//! Targets live in a [`TargetPool`] which tracks the viewport size. Passes
//! refer to targets by [`TargetId`] and never own them.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use shaderstack::render_graph::{PassScheduler, ShaderPass, ShaderPassDescriptor};
//! use shaderstack::effects::{slots, Preview};
//!
//! let mut scheduler = PassScheduler::new();
//! let mut preview = ShaderPass::new(
//!     ShaderPassDescriptor::new("Preview", Rc::new(Preview), UniformSet::new())
//!         .input(slots::INPUT)
//!         .priority(100),
//! );
//! preview.set_input(Some(TextureRef::Target(scene)));
//! scheduler.add(preview);
//!
//! // In render loop:
//! backend.begin_frame()?;
//! scheduler.execute(&mut backend, &ctx);
//! backend.end_frame();
//! ```

pub mod quad;
mod render_target;
mod scheduler;
mod shader_pass;

pub use render_target::{Extent, RenderTarget, TargetId, TargetPool};
pub use scheduler::{PassId, PassScheduler};
pub use shader_pass::{FrameContext, ShaderPass, ShaderPassDescriptor};
