use std::rc::Rc;

use super::Compositor;
use crate::backend::{Destination, FrameError, RenderBackend};
use crate::color::Color;
use crate::effects::{slots, RippleWave, RippleWaveParams};
use crate::pointer::PointerTracker;
use crate::render_graph::{Extent, PassId, ShaderPassDescriptor};
use crate::uniforms::UniformError;

/// Background the ripple pass clears the surface to.
pub const RIPPLE_CLEAR: Color = Color::rgb(6.0 / 255.0, 11.0 / 255.0, 20.0 / 255.0);

/// A single ripple wave pass painting the surface directly.
pub struct RippleScene {
    compositor: Compositor,
    pass: PassId,
}

fn clear_color(params: &RippleWaveParams) -> Option<Color> {
    params.clear.then_some(RIPPLE_CLEAR)
}

impl RippleScene {
    pub fn mount(params: &RippleWaveParams) -> Self {
        let mut compositor = Compositor::new(PointerTracker::default());
        let mut desc =
            ShaderPassDescriptor::new("Ripple Wave", Rc::new(RippleWave), params.uniforms())
                .time(slots::TIME)
                .resolution(slots::RESOLUTION)
                .destination(Destination::Surface)
                .priority(1);
        desc.clear = clear_color(params);
        let pass = compositor.add_pass(desc);
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

    /// Updates the wave parameters and clear policy in place.
    pub fn configure(&mut self, params: &RippleWaveParams) -> Result<(), UniformError> {
        match self.compositor.pass_mut(self.pass) {
            Some(pass) => {
                pass.set_clear(clear_color(params));
                params.apply(pass.uniforms())
            }
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
    fn paints_the_surface_opaque() {
        let extent = Extent::new(6, 4);
        let mut backend = SoftwareBackend::new(extent);
        let mut scene = RippleScene::mount(&RippleWaveParams::default());
        assert_eq!(scene.render(&mut backend, 0.5, extent).unwrap(), 1);

        let log = backend.draw_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].destination, Destination::Surface);
        assert!(backend.surface().pixels().iter().all(|p| p.w == 1.0));
        assert_eq!(backend.live_targets(), 0);
    }

    #[test]
    fn clear_can_be_turned_off() {
        let extent = Extent::new(2, 2);
        let mut backend = SoftwareBackend::new(extent);
        let mut scene = RippleScene::mount(&RippleWaveParams::new().clear(false));
        let pass = scene.compositor().pass(scene.pass).unwrap();
        assert_eq!(pass.descriptor().clear, None);

        scene.configure(&RippleWaveParams::new()).unwrap();
        let pass = scene.compositor().pass(scene.pass).unwrap();
        assert_eq!(pass.descriptor().clear, Some(RIPPLE_CLEAR));
        assert_eq!(scene.render(&mut backend, 0.1, extent).unwrap(), 1);
    }

    #[test]
    fn palette_changes_apply_in_place() {
        let mut scene = RippleScene::mount(&RippleWaveParams::default());
        scene
            .configure(&RippleWaveParams::new().hex_colors(&["#ff0000"]))
            .unwrap();
        let pass = scene.compositor().scheduler().iter().next().unwrap();
        assert_eq!(
            pass.uniforms().get("has_palette").and_then(|v| v.as_int()),
            Some(1)
        );
    }
}
