//! Frame driving and the built-in scenes.
//!
//! A [`Compositor`] owns everything one mounted scene needs across frames:
//! the target pool, the pass scheduler, the frame clock and the pointer
//! tracker. Each frame it advances the clock, resizes every target to the
//! viewport, and then runs the scheduled passes once.
//!
//! Three scenes are built on it:
//!
//! - [`PulseRing`]: border glow and an expanding ring combined additively,
//!   run through the optional distortion, dither, diffusion and blur stages
//!   and previewed on the surface.
//! - [`RippleScene`]: a single ripple pass painting the surface directly.
//! - [`GlowingFrameScene`]: the glowing frame in a single surface pass.

mod glowing_frame;
mod pulse_ring;
mod ripple;
mod topology;

pub use glowing_frame::GlowingFrameScene;
pub use pulse_ring::{PulseRing, PulseRingConfig, SpriteSource};
pub use ripple::RippleScene;
pub use topology::{resolve_input, EnabledStages, PipelineTopology, StageId};

use crate::backend::{FrameError, RenderBackend};
use crate::clock::FrameClock;
use crate::pointer::PointerTracker;
use crate::render_graph::{
    Extent, FrameContext, PassId, PassScheduler, ShaderPass, ShaderPassDescriptor, TargetId,
    TargetPool,
};

/// Per-mount rendering state shared by every scene.
pub struct Compositor {
    pool: TargetPool,
    scheduler: PassScheduler,
    clock: FrameClock,
    pointer: PointerTracker,
}

impl Compositor {
    pub fn new(pointer: PointerTracker) -> Self {
        Self {
            pool: TargetPool::new(),
            scheduler: PassScheduler::new(),
            clock: FrameClock::new(),
            pointer,
        }
    }

    /// Allocates a pooled target. It starts at 1x1 and follows the viewport.
    pub fn create_target(&mut self, backend: &mut dyn RenderBackend, label: &str) -> TargetId {
        self.pool.create_target(backend, label)
    }

    pub fn add_pass(&mut self, desc: ShaderPassDescriptor) -> PassId {
        self.scheduler.add(ShaderPass::new(desc))
    }

    pub fn pass(&self, id: PassId) -> Option<&ShaderPass> {
        self.scheduler.get(id)
    }

    pub fn pass_mut(&mut self, id: PassId) -> Option<&mut ShaderPass> {
        self.scheduler.get_mut(id)
    }

    pub fn scheduler(&self) -> &PassScheduler {
        &self.scheduler
    }

    pub fn targets(&self) -> &TargetPool {
        &self.pool
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn pointer(&self) -> &PointerTracker {
        &self.pointer
    }

    pub fn pointer_mut(&mut self) -> &mut PointerTracker {
        &mut self.pointer
    }

    /// Renders one frame.
    ///
    /// Every target is resized to `viewport` before the first draw. An empty
    /// viewport advances the clock and draws nothing. Returns the number of
    /// draws issued.
    pub fn render(
        &mut self,
        backend: &mut dyn RenderBackend,
        delta: f32,
        viewport: Extent,
    ) -> Result<usize, FrameError> {
        let time = self.clock.tick(delta);
        if viewport.is_empty() {
            return Ok(0);
        }

        if backend.surface_extent() != viewport {
            backend.resize_surface(viewport);
        }
        self.pool.resize_all(backend, viewport);

        let ctx = FrameContext::new(time, viewport, self.pointer.position());
        backend.begin_frame()?;
        let draws = self.scheduler.execute(backend, &ctx);
        backend.end_frame();
        Ok(draws)
    }

    /// Releases every pooled target.
    pub fn unmount(self, backend: &mut dyn RenderBackend) {
        self.pool.dispose_all(backend);
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use glam::{Vec2, Vec4};
    use proptest::prelude::*;

    use super::*;
    use crate::backend::{Destination, SoftwareBackend};
    use crate::color::Color;
    use crate::effects::{slots, CombineAdd, ExpandingRing, ExpandingRingParams, Solid};
    use crate::texture::TextureRef;
    use crate::uniforms::UniformSet;

    #[test]
    fn combines_two_generators_additively() {
        let extent = Extent::new(64, 64);
        let mut backend = SoftwareBackend::new(extent);
        let mut compositor = Compositor::new(PointerTracker::default());
        let a = compositor.create_target(&mut backend, "A");
        let b = compositor.create_target(&mut backend, "B");
        let combined = compositor.create_target(&mut backend, "Combined");

        for (target, color) in [(a, Color::rgb(0.2, 0.0, 0.0)), (b, Color::rgb(0.0, 0.3, 0.0))] {
            compositor.add_pass(
                ShaderPassDescriptor::new(
                    "generator",
                    Rc::new(Solid),
                    UniformSet::new().with("color", color),
                )
                .destination(Destination::Target(target))
                .clear(Color::BLACK),
            );
        }
        compositor.add_pass(
            ShaderPassDescriptor::new(
                "combine",
                Rc::new(CombineAdd),
                UniformSet::new()
                    .with(CombineAdd::INPUT_A, TextureRef::Target(a))
                    .with(CombineAdd::INPUT_B, TextureRef::Target(b)),
            )
            .destination(Destination::Target(combined))
            .priority(10),
        );

        assert_eq!(compositor.render(&mut backend, 0.016, extent).unwrap(), 3);

        for id in [a, b, combined] {
            assert_eq!(backend.target_extent(id), Some(extent));
        }
        let image = backend.target_pixels(combined).unwrap();
        for px in image.pixels() {
            assert!((*px - Vec4::new(0.2, 0.3, 0.0, 1.0)).abs().max_element() < 1e-6);
        }
    }

    #[test]
    fn time_accumulates_across_frames() {
        let extent = Extent::new(4, 4);
        let mut backend = SoftwareBackend::new(extent);
        let mut compositor = Compositor::new(PointerTracker::default());
        let id = compositor.add_pass(
            ShaderPassDescriptor::new(
                "ring",
                Rc::new(ExpandingRing),
                ExpandingRingParams::default().uniforms(),
            )
            .time(slots::TIME)
            .resolution(slots::RESOLUTION),
        );

        for delta in [0.016, 0.016, 0.017] {
            compositor.render(&mut backend, delta, extent).unwrap();
        }
        let pass = compositor.pass(id).unwrap();
        let time = pass.uniforms().get(slots::TIME).and_then(|v| v.as_float()).unwrap();
        assert!((time - 0.049).abs() < 1e-6);
        assert!((compositor.clock().elapsed() - 0.049).abs() < 1e-6);
        assert_eq!(
            pass.uniforms().get(slots::RESOLUTION).and_then(|v| v.as_vec2()),
            Some(Vec2::new(4.0, 4.0))
        );
    }

    #[test]
    fn resize_happens_before_the_first_draw() {
        let mut backend = SoftwareBackend::new(Extent::new(8, 8));
        let mut compositor = Compositor::new(PointerTracker::default());
        let target = compositor.create_target(&mut backend, "Target");
        compositor.add_pass(
            ShaderPassDescriptor::new(
                "solid",
                Rc::new(Solid),
                UniformSet::new().with("color", Color::WHITE),
            )
            .destination(Destination::Target(target)),
        );

        compositor.render(&mut backend, 0.0, Extent::new(8, 8)).unwrap();
        compositor.render(&mut backend, 0.0, Extent::new(12, 6)).unwrap();
        let image = backend.target_pixels(target).unwrap();
        assert_eq!(image.extent(), Extent::new(12, 6));
        assert!(image.pixels().iter().all(|&p| p == Vec4::ONE));
        assert_eq!(backend.surface_extent(), Extent::new(12, 6));
    }

    #[test]
    fn empty_viewport_skips_the_frame() {
        let mut backend = SoftwareBackend::new(Extent::new(8, 8));
        let mut compositor = Compositor::new(PointerTracker::default());
        compositor.add_pass(ShaderPassDescriptor::new(
            "solid",
            Rc::new(Solid),
            UniformSet::new().with("color", Color::WHITE),
        ));
        assert_eq!(compositor.render(&mut backend, 0.5, Extent::new(0, 8)).unwrap(), 0);
        assert_eq!(backend.frames_presented(), 0);
        assert_eq!(compositor.clock().elapsed(), 0.5);
    }

    #[test]
    fn unmount_releases_targets() {
        let mut backend = SoftwareBackend::new(Extent::new(8, 8));
        let mut compositor = Compositor::new(PointerTracker::default());
        compositor.create_target(&mut backend, "A");
        compositor.create_target(&mut backend, "B");
        compositor.unmount(&mut backend);
        assert_eq!(backend.live_targets(), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn targets_always_match_the_viewport(
            sizes in prop::collection::vec((1u32..24, 1u32..24), 1..6)
        ) {
            let mut backend = SoftwareBackend::new(Extent::new(4, 4));
            let mut compositor = Compositor::new(PointerTracker::default());
            let targets = [
                compositor.create_target(&mut backend, "A"),
                compositor.create_target(&mut backend, "B"),
            ];
            for &target in &targets {
                compositor.add_pass(
                    ShaderPassDescriptor::new(
                        "solid",
                        Rc::new(Solid),
                        UniformSet::new().with("color", Color::WHITE),
                    )
                    .destination(Destination::Target(target)),
                );
            }

            for (width, height) in sizes {
                let viewport = Extent::new(width, height);
                compositor.render(&mut backend, 0.016, viewport).unwrap();
                prop_assert_eq!(backend.surface_extent(), viewport);
                prop_assert_eq!(compositor.targets().extent(), Some(viewport));
                for &target in &targets {
                    prop_assert_eq!(backend.target_extent(target), Some(viewport));
                }
            }
        }
    }
}
