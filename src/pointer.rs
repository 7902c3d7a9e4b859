//! Cursor position and per-event velocity.
//!
//! The browser glue writes into a [`PointerTracker`] from its `pointermove`
//! listener; the orchestrator takes one [`PointerSample`] per frame and
//! hands that same snapshot to every world, so all worlds see a consistent
//! cursor within a frame.

use glam::Vec2;

use crate::physics::Viewport;

/// Last recorded cursor position and the delta that produced it, both in
/// screen pixels (origin top-left, y down).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerTracker {
    position: Vec2,
    velocity: Vec2,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker parked at the centre of `viewport` with zero velocity.
    pub fn centered(viewport: Viewport) -> Self {
        Self {
            position: viewport.center(),
            velocity: Vec2::ZERO,
        }
    }

    /// Records a raw pointer-move event.
    pub fn record(&mut self, x: f32, y: f32) {
        let next = Vec2::new(x, y);
        self.velocity = next - self.position;
        self.position = next;
    }

    pub fn position(&self) -> (f32, f32) {
        (self.position.x, self.position.y)
    }

    pub fn velocity(&self) -> (f32, f32) {
        (self.velocity.x, self.velocity.y)
    }

    pub fn sample(&self, viewport: Viewport) -> PointerSample {
        PointerSample {
            position: self.position,
            velocity: self.velocity,
            viewport,
        }
    }
}

/// Immutable per-frame snapshot of the tracker plus the viewport it was
/// taken against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub position: Vec2,
    pub velocity: Vec2,
    pub viewport: Viewport,
}

impl PointerSample {
    /// A motionless cursor at the centre of `viewport`.
    pub fn at_rest(viewport: Viewport) -> Self {
        PointerTracker::centered(viewport).sample(viewport)
    }

    /// Normalised 0..1 coordinates with y pointing up.
    pub fn uv(&self) -> Vec2 {
        self.viewport.to_uv(self.position)
    }

    /// Normalised device coordinates, -1..1 with y pointing up.
    pub fn ndc(&self) -> Vec2 {
        self.viewport.to_ndc(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_is_delta_between_last_two_events() {
        let mut tracker = PointerTracker::new();
        tracker.record(10.0, 20.0);
        tracker.record(15.0, 18.0);
        assert_eq!(tracker.position(), (15.0, 18.0));
        assert_eq!(tracker.velocity(), (5.0, -2.0));
        tracker.record(15.0, 18.0);
        assert_eq!(tracker.velocity(), (0.0, 0.0));
    }

    #[test]
    fn centered_sample_maps_to_origin() {
        let viewport = Viewport::new(800, 600);
        let sample = PointerSample::at_rest(viewport);
        assert_eq!(sample.ndc(), Vec2::ZERO);
        assert_eq!(sample.uv(), Vec2::splat(0.5));
    }
}
