//! Cursor-to-world mappings and the damping helpers the worlds share.

use glam::Vec2;

/// Drawable area in physical pixels. Never zero-sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width as f32 * 0.5, self.height as f32 * 0.5)
    }

    /// Screen pixels to 0..1, y up.
    pub fn to_uv(&self, screen: Vec2) -> Vec2 {
        Vec2::new(
            screen.x / self.width as f32,
            1.0 - screen.y / self.height as f32,
        )
    }

    /// Screen pixels to -1..1, y up.
    pub fn to_ndc(&self, screen: Vec2) -> Vec2 {
        self.to_uv(screen) * 2.0 - Vec2::ONE
    }

    /// Screen pixels to a symmetric world rectangle of half-extent `half`,
    /// y up. The city grid uses `half = 150`, the rain field `half = 50`.
    pub fn to_world_span(&self, screen: Vec2, half: f32) -> Vec2 {
        self.to_ndc(screen) * half
    }
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Mass-spring follower with velocity drag.
///
/// Each step: `v += (target - p) * force * 0.1; v *= viscosity; p += v`.
/// With viscosity in [0, 1) the follower always settles on the target; a
/// higher viscosity keeps more momentum and therefore lags further.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringFollower {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl SpringFollower {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
        }
    }

    pub fn step(&mut self, target: Vec2, force: f32, viscosity: f32) -> Vec2 {
        self.velocity += (target - self.position) * force * 0.1;
        self.velocity *= viscosity;
        self.position += self.velocity;
        self.position
    }
}

/// First-order follower: `p += (target - p) * gain` per step. The gain is
/// clamped to [0, 1] so the follower never overshoots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragFollower {
    pub position: Vec2,
}

impl DragFollower {
    pub fn at(position: Vec2) -> Self {
        Self { position }
    }

    pub fn step(&mut self, target: Vec2, gain: f32) -> Vec2 {
        self.position += (target - self.position) * gain.clamp(0.0, 1.0);
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spring_settles_on_target() {
        let mut spring = SpringFollower::at(Vec2::ZERO);
        for _ in 0..2_000 {
            spring.step(Vec2::new(0.75, 0.25), 0.32, 0.88);
        }
        assert!((spring.position - Vec2::new(0.75, 0.25)).length() < 1e-4);
    }

    #[test]
    fn higher_viscosity_keeps_more_momentum() {
        let target = Vec2::ONE;
        let mut thin = SpringFollower::at(Vec2::ZERO);
        let mut thick = SpringFollower::at(Vec2::ZERO);
        thin.step(target, 0.3, 0.5);
        thick.step(target, 0.3, 0.95);
        assert!(thick.position.x > thin.position.x);
    }

    #[test]
    fn drag_follower_never_overshoots_a_step() {
        let target = Vec2::new(150.0, -40.0);
        let mut follower = DragFollower::at(Vec2::ZERO);
        for _ in 0..50 {
            follower.step(target, 2.25);
            assert!(follower.position.is_finite());
            assert!(follower.position.x <= target.x && follower.position.y >= target.y);
        }
        assert_eq!(follower.position, target);
    }

    #[test]
    fn world_span_is_symmetric() {
        let viewport = Viewport::new(1920, 1080);
        assert_eq!(viewport.to_world_span(Vec2::ZERO, 150.0), Vec2::new(-150.0, 150.0));
        assert_eq!(
            viewport.to_world_span(Vec2::new(1920.0, 1080.0), 50.0),
            Vec2::new(50.0, -50.0)
        );
    }

    #[test]
    fn zero_sized_viewport_clamps() {
        let viewport = Viewport::new(0, 0);
        assert_eq!((viewport.width, viewport.height), (1, 1));
    }
}
