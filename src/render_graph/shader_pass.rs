//! Single full-screen shader passes.

use std::rc::Rc;

use glam::Vec2;

use super::Extent;
use crate::backend::{Destination, DrawCall, FrameError, RenderBackend};
use crate::clock::FrameTime;
use crate::color::Color;
use crate::effects::EffectBody;
use crate::program::{BlendMode, ProgramDesc, ProgramId};
use crate::texture::TextureRef;
use crate::uniforms::{UniformLayout, UniformSet, UniformValue};

/// Per-frame signals handed to every pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameContext {
    pub time: FrameTime,
    /// Viewport size in pixels.
    pub viewport: Extent,
    /// Normalized pointer position, origin bottom-left.
    pub pointer: Vec2,
}

impl FrameContext {
    pub fn new(time: FrameTime, viewport: Extent, pointer: Vec2) -> Self {
        Self {
            time,
            viewport,
            pointer,
        }
    }
}

/// Immutable definition of a shader pass.
///
/// Slot names refer to cells of `uniforms`. Named slots missing from the set
/// are added with a neutral value when the pass is created.
#[derive(Clone)]
pub struct ShaderPassDescriptor {
    pub label: String,
    pub effect: Rc<dyn EffectBody>,
    pub uniforms: UniformSet,
    /// Texture slot that receives the resolved input each frame.
    pub input_uniform: Option<String>,
    /// Float slot advanced by the frame delta.
    pub time_uniform: Option<String>,
    /// Vec2 slot set to the viewport size.
    pub resolution_uniform: Option<String>,
    /// Vec2 slot set to the pointer position.
    pub pointer_uniform: Option<String>,
    pub destination: Destination,
    /// Clear the destination before drawing. Alpha is forced to 1.
    pub clear: Option<Color>,
    pub blend: BlendMode,
    pub priority: i32,
}

impl ShaderPassDescriptor {
    /// A pass drawing `effect` to the surface with no clear, no slots and priority 0.
    pub fn new(
        label: impl Into<String>,
        effect: Rc<dyn EffectBody>,
        uniforms: UniformSet,
    ) -> Self {
        Self {
            label: label.into(),
            effect,
            uniforms,
            input_uniform: None,
            time_uniform: None,
            resolution_uniform: None,
            pointer_uniform: None,
            destination: Destination::Surface,
            clear: None,
            blend: BlendMode::Replace,
            priority: 0,
        }
    }

    pub fn input(mut self, slot: &str) -> Self {
        self.input_uniform = Some(slot.to_string());
        self
    }

    pub fn time(mut self, slot: &str) -> Self {
        self.time_uniform = Some(slot.to_string());
        self
    }

    pub fn resolution(mut self, slot: &str) -> Self {
        self.resolution_uniform = Some(slot.to_string());
        self
    }

    pub fn pointer(mut self, slot: &str) -> Self {
        self.pointer_uniform = Some(slot.to_string());
        self
    }

    pub fn destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn clear(mut self, color: Color) -> Self {
        self.clear = Some(color);
        self
    }

    pub fn blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ProgramState {
    /// Not built yet; built on first enabled execution.
    Pending,
    Ready(ProgramId),
    /// Compilation failed; the pass stays inert.
    Failed,
}

/// One full-screen draw from at most one input to one destination.
///
/// The program is built the first time the pass runs enabled, so a pass that
/// is never enabled allocates nothing. A pass whose program fails to build
/// reports the error once and never draws.
pub struct ShaderPass {
    desc: ShaderPassDescriptor,
    enabled: bool,
    program: ProgramState,
    input: Option<TextureRef>,
    warned_missing_input: bool,
}

impl ShaderPass {
    pub fn new(mut desc: ShaderPassDescriptor) -> Self {
        let slots = [
            (desc.time_uniform.clone(), UniformValue::Float(0.0)),
            (desc.resolution_uniform.clone(), UniformValue::Vec2(Vec2::ONE)),
            (desc.pointer_uniform.clone(), UniformValue::Vec2(Vec2::splat(0.5))),
            (desc.input_uniform.clone(), UniformValue::Texture(TextureRef::Fallback)),
        ];
        for (slot, neutral) in slots {
            let Some(slot) = slot else { continue };
            let matches = desc
                .uniforms
                .cell(&slot)
                .is_some_and(|cell| cell.kind() == neutral.kind());
            if !matches {
                desc.uniforms.insert(&slot, neutral);
            }
        }

        Self {
            desc,
            enabled: true,
            program: ProgramState::Pending,
            input: None,
            warned_missing_input: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.desc.label
    }

    pub fn priority(&self) -> i32 {
        self.desc.priority
    }

    pub fn destination(&self) -> Destination {
        self.desc.destination
    }

    pub fn descriptor(&self) -> &ShaderPassDescriptor {
        &self.desc
    }

    /// The pass's uniform cells. Values can be changed through the shared
    /// cells; the set of names is fixed.
    pub fn uniforms(&self) -> &UniformSet {
        &self.desc.uniforms
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Takes effect on the next execution.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Changes the clear policy from the next execution on.
    pub fn set_clear(&mut self, clear: Option<Color>) {
        self.desc.clear = clear;
    }

    /// Texture bound to the input slot on the next execution.
    pub fn set_input(&mut self, input: Option<TextureRef>) {
        self.input = input;
    }

    pub fn input(&self) -> Option<TextureRef> {
        self.input
    }

    /// Whether compilation was attempted and failed.
    pub fn is_broken(&self) -> bool {
        self.program == ProgramState::Failed
    }

    fn program(&mut self, backend: &mut dyn RenderBackend) -> Option<ProgramId> {
        match self.program {
            ProgramState::Ready(id) => return Some(id),
            ProgramState::Failed => return None,
            ProgramState::Pending => {}
        }

        let desc = ProgramDesc {
            label: self.desc.label.clone(),
            effect: Rc::clone(&self.desc.effect),
            layout: UniformLayout::new(&self.desc.uniforms),
            blend: self.desc.blend,
        };
        match backend.compile(&desc) {
            Ok(id) => {
                self.program = ProgramState::Ready(id);
                Some(id)
            }
            Err(e) => {
                log::error!("{}", e);
                self.program = ProgramState::Failed;
                None
            }
        }
    }

    fn update(&self, slot: &Option<String>, value: impl Into<UniformValue>) {
        if let Some(slot) = slot {
            if let Err(e) = self.desc.uniforms.set(slot, value) {
                log::error!("Pass '{}': {}", self.desc.label, e);
            }
        }
    }

    /// Updates the pass's uniforms from `ctx` and issues one draw.
    ///
    /// Returns whether a draw was issued. Disabled and broken passes return
    /// `Ok(false)` without touching their uniforms.
    pub fn execute(
        &mut self,
        backend: &mut dyn RenderBackend,
        ctx: &FrameContext,
    ) -> Result<bool, FrameError> {
        if !self.enabled {
            return Ok(false);
        }
        let Some(program) = self.program(backend) else {
            return Ok(false);
        };

        if let Some(cell) = self
            .desc
            .time_uniform
            .as_ref()
            .and_then(|slot| self.desc.uniforms.cell(slot))
        {
            if let Err(e) = cell.add_float(ctx.time.delta) {
                log::error!("Pass '{}': {}", self.desc.label, e);
            }
        }
        self.update(&self.desc.resolution_uniform, ctx.viewport.as_vec2());
        if self.desc.input_uniform.is_some() {
            if self.input.is_none() && !self.warned_missing_input {
                log::warn!(
                    "Pass '{}' has no input; sampling the fallback texture",
                    self.desc.label
                );
                self.warned_missing_input = true;
            }
            self.update(
                &self.desc.input_uniform,
                TextureRef::or_fallback(self.input),
            );
        }
        self.update(&self.desc.pointer_uniform, ctx.pointer);

        backend.draw(&DrawCall {
            label: &self.desc.label,
            program,
            uniforms: &self.desc.uniforms,
            destination: self.desc.destination,
            clear: self.desc.clear.map(|c| c.with_alpha(1.0)),
        })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareBackend;
    use crate::effects::{slots, Preview, Solid};
    use crate::render_graph::Extent;
    use glam::Vec4;

    struct Broken;

    impl EffectBody for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn fragment_source(&self) -> &'static str {
            "@fragment fn fs(frag: VertexOutput) -> @location(0) vec4f { return missing; }"
        }

        fn shade(&self, _frag: &crate::effects::Fragment<'_>) -> Vec4 {
            Vec4::ONE
        }
    }

    fn ctx(delta: f32, viewport: Extent) -> FrameContext {
        FrameContext::new(
            FrameTime {
                delta,
                elapsed: 0.0,
            },
            viewport,
            Vec2::splat(0.5),
        )
    }

    #[test]
    fn missing_input_samples_fallback() {
        let extent = Extent::new(4, 4);
        let mut backend = SoftwareBackend::new(extent);
        let mut pass = ShaderPass::new(
            ShaderPassDescriptor::new("preview", Rc::new(Preview), UniformSet::new())
                .input(slots::INPUT),
        );

        backend.begin_frame().unwrap();
        assert!(pass.execute(&mut backend, &ctx(0.0, extent)).unwrap());
        backend.end_frame();

        assert!(backend
            .surface()
            .pixels()
            .iter()
            .all(|&p| p == Vec4::new(0.0, 0.0, 0.0, 1.0)));
        assert_eq!(
            pass.uniforms().get(slots::INPUT).and_then(|v| v.as_texture()),
            Some(TextureRef::Fallback)
        );
    }

    #[test]
    fn time_slot_accumulates_deltas() {
        let extent = Extent::new(2, 2);
        let mut backend = SoftwareBackend::new(extent);
        let uniforms = UniformSet::new().with("color", Color::WHITE);
        let mut pass = ShaderPass::new(
            ShaderPassDescriptor::new("solid", Rc::new(Solid), uniforms).time(slots::TIME),
        );

        for delta in [0.016, 0.016, 0.017] {
            backend.begin_frame().unwrap();
            pass.execute(&mut backend, &ctx(delta, extent)).unwrap();
            backend.end_frame();
        }
        let time = pass.uniforms().get(slots::TIME).and_then(|v| v.as_float());
        assert!((time.unwrap() - 0.049).abs() < 1e-6);
    }

    #[test]
    fn disabled_pass_is_inert() {
        let extent = Extent::new(2, 2);
        let mut backend = SoftwareBackend::new(extent);
        let uniforms = UniformSet::new().with("color", Color::WHITE);
        let mut pass = ShaderPass::new(
            ShaderPassDescriptor::new("solid", Rc::new(Solid), uniforms)
                .time(slots::TIME)
                .resolution(slots::RESOLUTION),
        );
        pass.set_enabled(false);

        backend.begin_frame().unwrap();
        assert!(!pass.execute(&mut backend, &ctx(1.0, extent)).unwrap());
        backend.end_frame();

        assert!(backend.draw_log().is_empty());
        assert_eq!(pass.uniforms().get(slots::TIME).and_then(|v| v.as_float()), Some(0.0));
        assert_eq!(
            pass.uniforms().get(slots::RESOLUTION).and_then(|v| v.as_vec2()),
            Some(Vec2::ONE)
        );
    }

    #[test]
    fn clear_is_forced_opaque() {
        let extent = Extent::new(2, 2);
        let mut backend = SoftwareBackend::new(extent);
        let uniforms = UniformSet::new().with("color", Color::TRANSPARENT);
        let mut pass = ShaderPass::new(
            ShaderPassDescriptor::new("solid", Rc::new(Solid), uniforms)
                .clear(Color::rgba(0.0, 0.0, 1.0, 0.0))
                .blend(BlendMode::Normal),
        );

        backend.begin_frame().unwrap();
        pass.execute(&mut backend, &ctx(0.0, extent)).unwrap();
        backend.end_frame();

        assert_eq!(backend.surface().pixel(0, 0), Some(Vec4::new(0.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn compile_failure_leaves_pass_inert() {
        let extent = Extent::new(2, 2);
        let mut backend = SoftwareBackend::new(extent);
        let mut pass = ShaderPass::new(ShaderPassDescriptor::new(
            "broken",
            Rc::new(Broken),
            UniformSet::new(),
        ));

        backend.begin_frame().unwrap();
        assert!(!pass.execute(&mut backend, &ctx(0.0, extent)).unwrap());
        assert!(!pass.execute(&mut backend, &ctx(0.0, extent)).unwrap());
        backend.end_frame();

        assert!(pass.is_broken());
        assert!(backend.draw_log().is_empty());
    }

    #[test]
    fn mistyped_slots_are_replaced_with_neutral_values() {
        let uniforms = UniformSet::new().with(slots::TIME, Vec2::ZERO);
        let pass = ShaderPass::new(
            ShaderPassDescriptor::new("solid", Rc::new(Solid), uniforms).time(slots::TIME),
        );
        assert_eq!(pass.uniforms().get(slots::TIME).and_then(|v| v.as_float()), Some(0.0));
    }
}
