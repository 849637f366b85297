//! Frame timing.

use std::time::{Duration, Instant};

/// Time signals for a single frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTime {
    /// Seconds since the previous frame.
    pub delta: f32,
    /// Seconds accumulated since the clock was created.
    pub elapsed: f32,
}

/// Accumulates per-frame deltas into an elapsed time.
///
/// The clock holds no other state; it can be driven either by explicit deltas
/// (tests, fixed-step playback) or by wall-clock instants.
#[derive(Debug, Default)]
pub struct FrameClock {
    elapsed: f32,
    last_instant: Option<Instant>,
    frames: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock by `delta` seconds. Negative deltas are treated as zero.
    pub fn tick(&mut self, delta: f32) -> FrameTime {
        let delta = delta.max(0.0);
        self.elapsed += delta;
        self.frames += 1;
        FrameTime {
            delta,
            elapsed: self.elapsed,
        }
    }

    /// Advances the clock to `now`. The first call yields a zero delta.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let delta = self
            .last_instant
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);
        self.last_instant = Some(now);
        self.tick(delta.as_secs_f32())
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Number of frames ticked so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_deltas() {
        let mut clock = FrameClock::new();
        clock.tick(0.016);
        clock.tick(0.016);
        let t = clock.tick(0.017);
        assert!((t.delta - 0.017).abs() < 1e-6);
        assert!((t.elapsed - 0.049).abs() < 1e-6);
        assert_eq!(clock.frame_count(), 3);
    }

    #[test]
    fn first_instant_tick_has_zero_delta() {
        let mut clock = FrameClock::new();
        let start = Instant::now();
        assert_eq!(clock.tick_at(start).delta, 0.0);

        let t = clock.tick_at(start + Duration::from_millis(20));
        assert!((t.delta - 0.020).abs() < 1e-4);
    }

    #[test]
    fn negative_delta_is_clamped() {
        let mut clock = FrameClock::new();
        let t = clock.tick(-1.0);
        assert_eq!(t.delta, 0.0);
        assert_eq!(clock.elapsed(), 0.0);
    }

    #[test]
    fn instant_ticks_accumulate_wall_time() {
        let mut clock = FrameClock::new();
        let start = Instant::now();
        clock.tick_at(start);
        clock.tick_at(start + Duration::from_millis(10));
        let t = clock.tick_at(start + Duration::from_millis(30));
        assert!((t.elapsed - 0.030).abs() < 1e-4);
        assert_eq!(clock.tick_at(start).delta, 0.0);
        assert_eq!(clock.frame_count(), 4);
    }
}
