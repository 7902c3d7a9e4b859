//! Screen-space iris wipe layered over the cross-fade.
//!
//! The wipe closes a circular hole over the screen, holds it shut, then
//! opens it again past the corners. Partway through closing it asks for
//! the scene swap, so the cross-fade runs while the screen is mostly
//! covered. Everything is driven by the frame clock; there are no timers.

use crate::config::IrisTiming;
use crate::scene::SceneId;

/// Hole radius while no wipe is running.
pub const OPEN: f32 = 1.0;
/// Radius the opening stage overshoots to.
pub const OVERSHOOT: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IrisPhase {
    Idle,
    Closing { elapsed: f32 },
    Holding { elapsed: f32 },
    Opening { elapsed: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrisEvent {
    /// The screen is covered enough to change worlds.
    Swap(SceneId),
}

/// `cubic-bezier(x1, y1, x2, y2)` with fixed end points (0,0) and (1,1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl CubicBezier {
    /// Fast start, long soft landing.
    pub const EXPO_OUT: CubicBezier = CubicBezier {
        x1: 0.22,
        y1: 1.0,
        x2: 0.36,
        y2: 1.0,
    };

    fn sample(a1: f32, a2: f32, s: f32) -> f32 {
        let inv = 1.0 - s;
        3.0 * inv * inv * s * a1 + 3.0 * inv * s * s * a2 + s * s * s
    }

    fn slope(a1: f32, a2: f32, s: f32) -> f32 {
        let inv = 1.0 - s;
        3.0 * inv * inv * a1 + 6.0 * inv * s * (a2 - a1) + 3.0 * s * s * (1.0 - a2)
    }

    /// Eased value at `x` in [0, 1].
    pub fn ease(&self, x: f32) -> f32 {
        let x = x.clamp(0.0, 1.0);
        if x == 0.0 || x == 1.0 {
            return x;
        }
        // Newton first, bisection if the slope flattens out.
        let mut s = x;
        for _ in 0..8 {
            let err = Self::sample(self.x1, self.x2, s) - x;
            if err.abs() < 1e-6 {
                return Self::sample(self.y1, self.y2, s);
            }
            let d = Self::slope(self.x1, self.x2, s);
            if d.abs() < 1e-6 {
                break;
            }
            s -= err / d;
        }
        let (mut lo, mut hi) = (0.0f32, 1.0f32);
        s = x;
        for _ in 0..40 {
            let value = Self::sample(self.x1, self.x2, s);
            if (value - x).abs() < 1e-6 {
                break;
            }
            if value < x {
                lo = s;
            } else {
                hi = s;
            }
            s = (lo + hi) * 0.5;
        }
        Self::sample(self.y1, self.y2, s)
    }

    /// Smallest `x` whose eased value reaches `y`; assumes the curve is
    /// monotone.
    pub fn invert(&self, y: f32) -> f32 {
        let y = y.clamp(0.0, 1.0);
        let (mut lo, mut hi) = (0.0f32, 1.0f32);
        for _ in 0..40 {
            let mid = (lo + hi) * 0.5;
            if self.ease(mid) < y {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        hi
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrisWipe {
    timing: IrisTiming,
    easing: CubicBezier,
    phase: IrisPhase,
    target: Option<SceneId>,
}

impl IrisWipe {
    pub fn new(timing: IrisTiming) -> Self {
        Self {
            timing: sanitize(timing),
            easing: CubicBezier::EXPO_OUT,
            phase: IrisPhase::Idle,
            target: None,
        }
    }

    pub fn phase(&self) -> IrisPhase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == IrisPhase::Idle
    }

    /// Starts a wipe toward `target`. A wipe already in flight is turned
    /// around: closing resumes from wherever the hole currently is, and the
    /// new target replaces the old one.
    pub fn begin(&mut self, target: SceneId) {
        let elapsed = match self.phase {
            IrisPhase::Idle => 0.0,
            IrisPhase::Closing { elapsed } => elapsed,
            IrisPhase::Holding { .. } => self.timing.closing,
            IrisPhase::Opening { .. } => {
                let covered = (OPEN - self.radius()).max(0.0);
                self.easing.invert(covered) * self.timing.closing
            }
        };
        if elapsed > self.timing.swap_at {
            log::debug!("iris redirected past its swap point, swapping to `{target}` next tick");
        }
        self.phase = IrisPhase::Closing { elapsed };
        self.target = Some(target);
    }

    /// Hole radius: [`OPEN`] when idle, 0 when fully closed, up to
    /// [`OVERSHOOT`] while opening.
    pub fn radius(&self) -> f32 {
        match self.phase {
            IrisPhase::Idle => OPEN,
            IrisPhase::Closing { elapsed } => {
                OPEN * (1.0 - self.easing.ease(elapsed / self.timing.closing))
            }
            IrisPhase::Holding { .. } => 0.0,
            IrisPhase::Opening { elapsed } => {
                OVERSHOOT * self.easing.ease(elapsed / self.timing.opening)
            }
        }
    }

    /// Advances by `dt` seconds, crossing as many stages as `dt` covers.
    /// Emits the swap once per wipe, when closing passes its swap point
    /// (or immediately, for a redirected wipe already past it).
    pub fn tick(&mut self, dt: f32) -> Option<IrisEvent> {
        let mut left = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let mut event = None;
        loop {
            match self.phase {
                IrisPhase::Idle => return event,
                IrisPhase::Closing { elapsed } => {
                    let now = elapsed + left;
                    if now >= self.timing.swap_at {
                        if let Some(target) = self.target.take() {
                            event = Some(IrisEvent::Swap(target));
                        }
                    }
                    if now < self.timing.closing {
                        self.phase = IrisPhase::Closing { elapsed: now };
                        return event;
                    }
                    left = now - self.timing.closing;
                    self.phase = IrisPhase::Holding { elapsed: 0.0 };
                }
                IrisPhase::Holding { elapsed } => {
                    let now = elapsed + left;
                    if now < self.timing.hold {
                        self.phase = IrisPhase::Holding { elapsed: now };
                        return event;
                    }
                    left = now - self.timing.hold;
                    self.phase = IrisPhase::Opening { elapsed: 0.0 };
                }
                IrisPhase::Opening { elapsed } => {
                    let now = elapsed + left;
                    if now < self.timing.opening {
                        self.phase = IrisPhase::Opening { elapsed: now };
                        return event;
                    }
                    self.phase = IrisPhase::Idle;
                    return event;
                }
            }
        }
    }
}

fn sanitize(timing: IrisTiming) -> IrisTiming {
    let positive = |v: f32, fallback: f32| if v.is_finite() && v > 0.0 { v } else { fallback };
    let defaults = IrisTiming::default();
    let closing = positive(timing.closing, defaults.closing);
    IrisTiming {
        closing,
        hold: if timing.hold.is_finite() { timing.hold.max(0.0) } else { defaults.hold },
        opening: positive(timing.opening, defaults.opening),
        swap_at: if timing.swap_at.is_finite() {
            timing.swap_at.clamp(0.0, closing)
        } else {
            defaults.swap_at.min(closing)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(iris: &mut IrisWipe, seconds: f32, step: f32) -> Vec<IrisEvent> {
        let mut events = Vec::new();
        let mut t = 0.0;
        while t < seconds {
            events.extend(iris.tick(step));
            t += step;
        }
        events
    }

    #[test]
    fn easing_hits_end_points_and_rises_fast() {
        let curve = CubicBezier::EXPO_OUT;
        assert_eq!(curve.ease(0.0), 0.0);
        assert_eq!(curve.ease(1.0), 1.0);
        assert!(curve.ease(0.25) > 0.6);
        assert!((curve.ease(curve.invert(0.5)) - 0.5).abs() < 1e-3);
    }

    #[test]
    fn full_wipe_swaps_once_and_returns_to_idle() {
        let mut iris = IrisWipe::new(IrisTiming::default());
        iris.begin(SceneId::Rain);
        assert_eq!(iris.radius(), OPEN);

        let events = run(&mut iris, 0.6, 0.1);
        assert_eq!(events, vec![IrisEvent::Swap(SceneId::Rain)]);
        assert!(iris.radius() < OPEN);

        let events = run(&mut iris, 2.0, 0.1);
        assert!(events.is_empty());
        assert!(matches!(iris.phase(), IrisPhase::Holding { .. }));
        assert_eq!(iris.radius(), 0.0);

        run(&mut iris, 2.5, 0.1);
        assert!(iris.is_idle());
        assert_eq!(iris.radius(), OPEN);
    }

    #[test]
    fn one_huge_step_crosses_every_stage() {
        let mut iris = IrisWipe::new(IrisTiming::default());
        iris.begin(SceneId::City);
        assert_eq!(iris.tick(60.0), Some(IrisEvent::Swap(SceneId::City)));
        assert!(iris.is_idle());
        assert_eq!(iris.tick(1.0), None);
    }

    #[test]
    fn onboarding_swap_waits_longer() {
        let mut iris = IrisWipe::new(IrisTiming::onboarding());
        iris.begin(SceneId::Mandala);
        assert!(run(&mut iris, 1.3, 0.1).is_empty());
        assert_eq!(iris.tick(0.3), Some(IrisEvent::Swap(SceneId::Mandala)));
    }

    #[test]
    fn redirect_while_opening_closes_from_current_radius() {
        let mut iris = IrisWipe::new(IrisTiming::default());
        iris.begin(SceneId::City);
        run(&mut iris, 3.2, 0.1);
        assert!(matches!(iris.phase(), IrisPhase::Opening { .. }));
        let radius = iris.radius();
        assert!(radius > 0.0 && radius < OPEN);

        iris.begin(SceneId::Flow);
        assert!((iris.radius() - radius).abs() < 1e-3);
        assert_eq!(run(&mut iris, 6.0, 0.1), vec![IrisEvent::Swap(SceneId::Flow)]);
        assert!(iris.is_idle());
    }

    #[test]
    fn redirect_while_holding_swaps_on_next_tick() {
        let mut iris = IrisWipe::new(IrisTiming::default());
        iris.begin(SceneId::City);
        run(&mut iris, 2.5, 0.1);
        assert!(matches!(iris.phase(), IrisPhase::Holding { .. }));
        iris.begin(SceneId::Mandala);
        assert_eq!(iris.tick(0.0), Some(IrisEvent::Swap(SceneId::Mandala)));
    }
}
