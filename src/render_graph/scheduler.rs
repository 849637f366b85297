//! Priority-ordered pass execution.

use super::shader_pass::{FrameContext, ShaderPass};
use crate::backend::RenderBackend;

/// Handle to a pass registered with a [`PassScheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PassId(u32);

struct Entry {
    id: PassId,
    pass: ShaderPass,
}

/// Runs passes in ascending priority.
///
/// Passes with equal priority run in registration order. The order is fixed
/// when a pass is added, so it is identical every frame.
#[derive(Default)]
pub struct PassScheduler {
    entries: Vec<Entry>,
    next_id: u32,
}

impl PassScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pass after every pass of lower or equal priority.
    pub fn add(&mut self, pass: ShaderPass) -> PassId {
        let id = PassId(self.next_id);
        self.next_id += 1;
        let at = self
            .entries
            .partition_point(|e| e.pass.priority() <= pass.priority());
        self.entries.insert(at, Entry { id, pass });
        id
    }

    pub fn get(&self, id: PassId) -> Option<&ShaderPass> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.pass)
    }

    pub fn get_mut(&mut self, id: PassId) -> Option<&mut ShaderPass> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .map(|e| &mut e.pass)
    }

    /// Passes in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &ShaderPass> {
        self.entries.iter().map(|e| &e.pass)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Executes every enabled pass. A pass that fails to draw is logged and
    /// skipped. Returns the number of draws issued.
    pub fn execute(&mut self, backend: &mut dyn RenderBackend, ctx: &FrameContext) -> usize {
        let mut draws = 0;
        for entry in &mut self.entries {
            match entry.pass.execute(backend, ctx) {
                Ok(true) => draws += 1,
                Ok(false) => {}
                Err(e) => log::error!("Pass '{}' failed: {}", entry.pass.label(), e),
            }
        }
        draws
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use glam::Vec2;
    use proptest::prelude::*;

    use super::*;
    use crate::backend::{Destination, SoftwareBackend};
    use crate::clock::FrameTime;
    use crate::color::Color;
    use crate::effects::Solid;
    use crate::render_graph::{Extent, ShaderPassDescriptor, TargetId};
    use crate::uniforms::UniformSet;

    fn solid(label: &str, priority: i32) -> ShaderPass {
        ShaderPass::new(
            ShaderPassDescriptor::new(
                label,
                Rc::new(Solid),
                UniformSet::new().with("color", Color::WHITE),
            )
            .priority(priority),
        )
    }

    fn ctx(extent: Extent) -> FrameContext {
        FrameContext::new(FrameTime::default(), extent, Vec2::splat(0.5))
    }

    #[test]
    fn runs_in_priority_order_with_stable_ties() {
        let extent = Extent::new(1, 1);
        let mut backend = SoftwareBackend::new(extent);
        let mut scheduler = PassScheduler::new();
        scheduler.add(solid("late", 100));
        scheduler.add(solid("first-tie", 0));
        scheduler.add(solid("middle", 10));
        scheduler.add(solid("second-tie", 0));

        for _ in 0..2 {
            backend.begin_frame().unwrap();
            assert_eq!(scheduler.execute(&mut backend, &ctx(extent)), 4);
            backend.end_frame();
            let order: Vec<_> = backend.draw_log().iter().map(|r| r.label.as_str()).collect();
            assert_eq!(order, ["first-tie", "second-tie", "middle", "late"]);
        }
    }

    #[test]
    fn failing_pass_does_not_stop_siblings() {
        let extent = Extent::new(1, 1);
        let mut backend = SoftwareBackend::new(extent);
        let mut scheduler = PassScheduler::new();
        scheduler.add(ShaderPass::new(
            ShaderPassDescriptor::new(
                "dangling",
                Rc::new(Solid),
                UniformSet::new().with("color", Color::WHITE),
            )
            .destination(Destination::Target(TargetId(99))),
        ));
        scheduler.add(solid("surface", 1));

        backend.begin_frame().unwrap();
        assert_eq!(scheduler.execute(&mut backend, &ctx(extent)), 1);
        backend.end_frame();
        assert_eq!(backend.draw_log()[0].label, "surface");
    }

    #[test]
    fn toggled_passes_are_skipped() {
        let extent = Extent::new(1, 1);
        let mut backend = SoftwareBackend::new(extent);
        let mut scheduler = PassScheduler::new();
        let a = scheduler.add(solid("a", 0));
        scheduler.add(solid("b", 0));
        scheduler.get_mut(a).unwrap().set_enabled(false);

        backend.begin_frame().unwrap();
        assert_eq!(scheduler.execute(&mut backend, &ctx(extent)), 1);
        backend.end_frame();
        assert_eq!(backend.draw_log()[0].label, "b");
    }

    proptest! {
        #[test]
        fn order_is_a_stable_sort_by_priority(
            priorities in prop::collection::vec(-4i32..4, 1..12)
        ) {
            let extent = Extent::new(1, 1);
            let mut backend = SoftwareBackend::new(extent);
            let mut scheduler = PassScheduler::new();
            for (i, &priority) in priorities.iter().enumerate() {
                scheduler.add(solid(&i.to_string(), priority));
            }

            let mut expected: Vec<usize> = (0..priorities.len()).collect();
            expected.sort_by_key(|&i| priorities[i]);

            let mut frames = Vec::new();
            for _ in 0..2 {
                backend.begin_frame().unwrap();
                scheduler.execute(&mut backend, &ctx(extent));
                backend.end_frame();
                let order: Vec<usize> = backend
                    .draw_log()
                    .iter()
                    .map(|r| r.label.parse().unwrap())
                    .collect();
                prop_assert!(order.windows(2).all(|w| priorities[w[0]] <= priorities[w[1]]));
                prop_assert_eq!(&order, &expected);
                frames.push(order);
            }
            prop_assert_eq!(&frames[0], &frames[1]);
        }
    }
}
