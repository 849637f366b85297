//! Pointer tracking in normalized surface coordinates.
//!
//! [`PointerTracker`] turns host-window pointer positions into a position in
//! `[0, 1] x [0, 1]` with the origin at the bottom-left corner of the render
//! surface. When tracking is disabled, or the pointer leaves the surface, the
//! position rests at a configurable center.

use glam::Vec2;
use winit::event::WindowEvent;

/// The pointer-sensitive area of the host window, in host pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl SurfaceRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rect anchored at the window origin.
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Tracker state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerPhase {
    /// Position is frozen at the resting center.
    Resting,
    /// Position follows pointer movement over the surface.
    Tracking,
}

/// Maintains the normalized pointer position fed to pointer-aware passes.
#[derive(Clone, Debug)]
pub struct PointerTracker {
    enabled: bool,
    center: Vec2,
    position: Vec2,
    phase: PointerPhase,
    surface: SurfaceRect,
    /// Bounds used for normalization; dropped on resize, rebuilt on the next move.
    bounds: Option<SurfaceRect>,
}

impl Default for PointerTracker {
    fn default() -> Self {
        Self::new(false, Vec2::splat(0.5))
    }
}

impl PointerTracker {
    pub fn new(enabled: bool, center: Vec2) -> Self {
        Self {
            enabled,
            center,
            position: center,
            phase: PointerPhase::Resting,
            surface: SurfaceRect::from_size(0.0, 0.0),
            bounds: None,
        }
    }

    /// Enables or disables tracking. Disabling rests the pointer immediately.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.rest();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Changes the resting center. Applies immediately while resting.
    pub fn set_center(&mut self, center: Vec2) {
        self.center = center.clamp(Vec2::ZERO, Vec2::ONE);
        if self.phase == PointerPhase::Resting {
            self.position = self.center;
        }
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    /// Current normalized position.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn phase(&self) -> PointerPhase {
        self.phase
    }

    /// The pointer entered the surface.
    pub fn enter(&mut self) {
        if !self.enabled {
            return;
        }
        self.bounds = Some(self.surface);
        self.phase = PointerPhase::Tracking;
    }

    /// The pointer left the surface.
    pub fn leave(&mut self) {
        self.rest();
    }

    /// The pointer moved to `host` (host-window pixels).
    pub fn move_to(&mut self, host: Vec2) {
        if !self.enabled {
            return;
        }
        let rect = *self.bounds.get_or_insert(self.surface);
        if rect.is_empty() {
            return;
        }

        let x = (host.x - rect.x) / rect.width;
        let y = 1.0 - (host.y - rect.y) / rect.height;
        self.position = Vec2::new(x, y).clamp(Vec2::ZERO, Vec2::ONE);
        self.phase = PointerPhase::Tracking;
    }

    /// The surface moved or changed size.
    pub fn resize(&mut self, surface: SurfaceRect) {
        self.surface = surface;
        self.bounds = None;
    }

    /// Feeds a winit window event into the tracker.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CursorEntered { .. } => self.enter(),
            WindowEvent::CursorLeft { .. } => self.leave(),
            WindowEvent::CursorMoved { position, .. } => {
                self.move_to(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::Resized(size) => {
                self.resize(SurfaceRect::from_size(
                    size.width as f32,
                    size.height as f32,
                ));
            }
            _ => {}
        }
    }

    fn rest(&mut self) {
        self.position = self.center;
        self.phase = PointerPhase::Resting;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracking(width: f32, height: f32) -> PointerTracker {
        let mut tracker = PointerTracker::new(true, Vec2::splat(0.5));
        tracker.resize(SurfaceRect::from_size(width, height));
        tracker
    }

    #[test]
    fn flips_vertical_axis() {
        let mut tracker = tracking(200.0, 100.0);
        tracker.enter();
        tracker.move_to(Vec2::new(50.0, 25.0));
        assert_eq!(tracker.position(), Vec2::new(0.25, 0.75));
        assert_eq!(tracker.phase(), PointerPhase::Tracking);
    }

    #[test]
    fn clamps_outside_positions() {
        let mut tracker = tracking(100.0, 100.0);
        tracker.move_to(Vec2::new(-40.0, 250.0));
        assert_eq!(tracker.position(), Vec2::new(0.0, 0.0));
    }

    #[test]
    fn leaving_rests_at_center() {
        let mut tracker = tracking(100.0, 100.0);
        tracker.enter();
        tracker.move_to(Vec2::new(10.0, 10.0));
        tracker.leave();
        assert_eq!(tracker.position(), Vec2::splat(0.5));
        assert_eq!(tracker.phase(), PointerPhase::Resting);
    }

    #[test]
    fn disabled_tracker_stays_at_default() {
        let mut tracker = PointerTracker::new(false, Vec2::new(0.3, 0.6));
        tracker.resize(SurfaceRect::from_size(100.0, 100.0));
        for i in 0..5 {
            tracker.enter();
            tracker.move_to(Vec2::new(i as f32 * 20.0, 5.0));
            assert_eq!(tracker.position(), Vec2::new(0.3, 0.6));
        }
    }

    #[test]
    fn disabling_mid_track_freezes_at_center() {
        let mut tracker = tracking(100.0, 100.0);
        tracker.move_to(Vec2::new(90.0, 90.0));
        tracker.set_enabled(false);
        tracker.move_to(Vec2::new(10.0, 10.0));
        assert_eq!(tracker.position(), Vec2::splat(0.5));
        assert_eq!(tracker.phase(), PointerPhase::Resting);
    }

    #[test]
    fn resize_invalidates_cached_bounds() {
        let mut tracker = tracking(100.0, 100.0);
        tracker.move_to(Vec2::new(50.0, 50.0));
        tracker.resize(SurfaceRect::from_size(200.0, 200.0));
        tracker.move_to(Vec2::new(50.0, 50.0));
        assert_eq!(tracker.position(), Vec2::new(0.25, 0.75));
    }

    #[test]
    fn offset_surface_is_respected() {
        let mut tracker = PointerTracker::new(true, Vec2::splat(0.5));
        tracker.resize(SurfaceRect::new(100.0, 50.0, 100.0, 100.0));
        tracker.move_to(Vec2::new(150.0, 150.0));
        assert_eq!(tracker.position(), Vec2::new(0.5, 0.0));
    }

    #[test]
    fn zero_sized_surface_ignores_moves() {
        let mut tracker = PointerTracker::new(true, Vec2::splat(0.5));
        tracker.move_to(Vec2::new(10.0, 10.0));
        assert_eq!(tracker.position(), Vec2::splat(0.5));
    }
}
