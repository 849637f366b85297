//! Render targets and the pool that owns them.

use glam::Vec2;

use crate::backend::RenderBackend;

/// Pixel dimensions of a target or surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    /// The 1x1 size targets are created with before the first resize.
    pub const UNIT: Extent = Extent {
        width: 1,
        height: 1,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height, or 1.0 for an empty extent.
    pub fn aspect(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    /// Number of pixels covered.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Stable identity of a render target.
///
/// The id survives resizes; only the backing storage is reallocated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub(crate) u32);

/// Bookkeeping for one off-screen color buffer owned by a [`TargetPool`].
///
/// The pixel storage lives in the backend; this records what the pool asked for.
#[derive(Clone, Debug)]
pub struct RenderTarget {
    id: TargetId,
    label: String,
    extent: Extent,
}

impl RenderTarget {
    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }
}

/// Owns every off-screen target of one compositor mount.
///
/// Targets start at 1x1 and follow the viewport through [`resize_all`](Self::resize_all).
/// [`dispose_all`](Self::dispose_all) consumes the pool, so a released target
/// cannot be reached through it afterwards.
#[derive(Debug, Default)]
pub struct TargetPool {
    targets: Vec<RenderTarget>,
    extent: Option<Extent>,
}

impl TargetPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a 1x1 placeholder target.
    pub fn create_target(&mut self, backend: &mut dyn RenderBackend, label: &str) -> TargetId {
        let id = backend.create_target(label, Extent::UNIT);
        self.targets.push(RenderTarget {
            id,
            label: label.to_string(),
            extent: Extent::UNIT,
        });
        id
    }

    /// Resizes every target to `extent`.
    ///
    /// Zero-sized extents are ignored and repeated calls with the same size do
    /// nothing. Returns whether any target was reallocated.
    pub fn resize_all(&mut self, backend: &mut dyn RenderBackend, extent: Extent) -> bool {
        if extent.is_empty() {
            return false;
        }
        self.extent = Some(extent);

        let mut changed = false;
        for target in &mut self.targets {
            if target.extent != extent {
                backend.resize_target(target.id, extent);
                target.extent = extent;
                changed = true;
            }
        }
        if changed {
            log::debug!(
                "Resized {} render targets to {}x{}",
                self.targets.len(),
                extent.width,
                extent.height
            );
        }
        changed
    }

    /// Releases every target exactly once.
    pub fn dispose_all(self, backend: &mut dyn RenderBackend) {
        for target in &self.targets {
            backend.release_target(target.id);
        }
        log::debug!("Disposed {} render targets", self.targets.len());
    }

    pub fn get(&self, id: TargetId) -> Option<&RenderTarget> {
        self.targets.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderTarget> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// The last size applied by [`resize_all`](Self::resize_all).
    pub fn extent(&self) -> Option<Extent> {
        self.extent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareBackend;

    #[test]
    fn targets_start_as_placeholders() {
        let mut backend = SoftwareBackend::new(Extent::new(64, 64));
        let mut pool = TargetPool::new();
        let id = pool.create_target(&mut backend, "Border");
        assert_eq!(pool.get(id).map(RenderTarget::extent), Some(Extent::UNIT));
        assert_eq!(backend.target_extent(id), Some(Extent::UNIT));
    }

    #[test]
    fn resize_reaches_every_target() {
        let mut backend = SoftwareBackend::new(Extent::new(64, 64));
        let mut pool = TargetPool::new();
        let ids: Vec<_> = (0..3)
            .map(|i| pool.create_target(&mut backend, &format!("Target {i}")))
            .collect();

        assert!(pool.resize_all(&mut backend, Extent::new(64, 48)));
        for id in ids {
            assert_eq!(backend.target_extent(id), Some(Extent::new(64, 48)));
            assert_eq!(pool.get(id).unwrap().extent(), Extent::new(64, 48));
        }
    }

    #[test]
    fn resize_is_idempotent_and_ignores_zero() {
        let mut backend = SoftwareBackend::new(Extent::new(64, 64));
        let mut pool = TargetPool::new();
        let id = pool.create_target(&mut backend, "Only");

        assert!(pool.resize_all(&mut backend, Extent::new(32, 32)));
        assert!(!pool.resize_all(&mut backend, Extent::new(32, 32)));
        assert!(!pool.resize_all(&mut backend, Extent::new(0, 32)));
        assert_eq!(backend.target_extent(id), Some(Extent::new(32, 32)));
    }

    #[test]
    fn late_targets_catch_up_on_next_resize() {
        let mut backend = SoftwareBackend::new(Extent::new(64, 64));
        let mut pool = TargetPool::new();
        pool.resize_all(&mut backend, Extent::new(16, 8));
        let id = pool.create_target(&mut backend, "Late");
        assert_eq!(backend.target_extent(id), Some(Extent::UNIT));

        assert!(pool.resize_all(&mut backend, Extent::new(16, 8)));
        assert_eq!(backend.target_extent(id), Some(Extent::new(16, 8)));
    }

    #[test]
    fn dispose_releases_every_target() {
        let mut backend = SoftwareBackend::new(Extent::new(64, 64));
        let mut pool = TargetPool::new();
        let a = pool.create_target(&mut backend, "A");
        let b = pool.create_target(&mut backend, "B");
        assert_eq!(backend.live_targets(), 2);

        pool.dispose_all(&mut backend);
        assert_eq!(backend.live_targets(), 0);
        assert_eq!(backend.target_extent(a), None);
        assert_eq!(backend.target_extent(b), None);
    }
}
