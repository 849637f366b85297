use std::rc::Rc;

use super::Compositor;
use crate::backend::{Destination, FrameError, RenderBackend};
use crate::color::Color;
use crate::effects::{slots, GlowingFrame, GlowingFrameParams};
use crate::pointer::PointerTracker;
use crate::render_graph::{Extent, PassId, ShaderPassDescriptor};
use crate::uniforms::UniformError;

/// The whole glowing frame in one pass straight to the surface.
pub struct GlowingFrameScene {
    compositor: Compositor,
    pass: PassId,
}

impl GlowingFrameScene {
    pub fn mount(params: &GlowingFrameParams) -> Self {
        let mut compositor = Compositor::new(PointerTracker::default());
        let pass = compositor.add_pass(
            ShaderPassDescriptor::new("Glowing Frame", Rc::new(GlowingFrame), params.uniforms())
                .time(slots::TIME)
                .resolution(slots::RESOLUTION)
                .destination(Destination::Surface)
                .clear(Color::BLACK)
                .priority(1),
        );
        Self { compositor, pass }
    }

    pub fn render(
        &mut self,
        backend: &mut dyn RenderBackend,
        delta: f32,
        viewport: Extent,
    ) -> Result<usize, FrameError> {
        self.compositor.render(backend, delta, viewport)
    }

    pub fn configure(&self, params: &GlowingFrameParams) -> Result<(), UniformError> {
        match self.compositor.pass(self.pass) {
            Some(pass) => params.apply(pass.uniforms()),
            None => Ok(()),
        }
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn unmount(self, backend: &mut dyn RenderBackend) {
        self.compositor.unmount(backend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareBackend;

    #[test]
    fn frame_glows_brighter_at_the_edges() {
        let extent = Extent::new(16, 16);
        let mut backend = SoftwareBackend::new(extent);
        let mut scene = GlowingFrameScene::mount(&GlowingFrameParams::new().halftone(false));
        assert_eq!(scene.render(&mut backend, 0.0, extent).unwrap(), 1);

        let surface = backend.surface();
        let edge = surface.pixel(0, 8).unwrap();
        let center = surface.pixel(8, 8).unwrap();
        assert!(edge.z > center.z);
        assert!(surface.pixels().iter().all(|p| p.w == 1.0));
        assert_eq!(backend.live_targets(), 0);
    }

    #[test]
    fn time_drives_the_ring() {
        let extent = Extent::new(8, 8);
        let mut backend = SoftwareBackend::new(extent);
        let mut scene = GlowingFrameScene::mount(&GlowingFrameParams::default());
        for _ in 0..3 {
            scene.render(&mut backend, 0.5, extent).unwrap();
        }
        assert!((scene.compositor().clock().elapsed() - 1.5).abs() < 1e-6);
        let time = scene
            .compositor()
            .pass(scene.pass)
            .and_then(|p| p.uniforms().get(slots::TIME))
            .and_then(|v| v.as_float());
        assert_eq!(time, Some(1.5));
    }

    #[test]
    fn configure_updates_the_pass() {
        let scene = GlowingFrameScene::mount(&GlowingFrameParams::default());
        scene
            .configure(&GlowingFrameParams::new().warp(0.0))
            .unwrap();
        let warp = scene
            .compositor()
            .pass(scene.pass)
            .and_then(|p| p.uniforms().get("warp"))
            .and_then(|v| v.as_float());
        assert_eq!(warp, Some(0.0));
    }
}
