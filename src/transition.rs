//! Cross-fade state machine.
//!
//! `Idle` shows `active` alone. `switch_to` a different world starts a
//! blend toward `pending`; `tick` advances it by wall-clock time and, once
//! progress reaches 1, promotes `pending` to `active`. A switch issued
//! mid-blend redirects it: the new target replaces `pending` and progress
//! restarts from 0. Nothing is ever queued.

use crate::physics::smoothstep;
use crate::scene::SceneId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Transitioning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Already showing that world.
    Ignored,
    Started,
    /// A blend was in flight and now heads somewhere else.
    Redirected,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    active: SceneId,
    pending: SceneId,
    progress: f32,
    rate: f32,
    transitioning: bool,
}

impl Transition {
    /// `duration` is the wall-clock length of one blend in seconds.
    pub fn new(initial: SceneId, duration: f32) -> Self {
        Self {
            active: initial,
            pending: initial,
            progress: 0.0,
            rate: rate_for(duration),
            transitioning: false,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.transitioning {
            Phase::Transitioning
        } else {
            Phase::Idle
        }
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    pub fn active(&self) -> SceneId {
        self.active
    }

    pub fn pending(&self) -> SceneId {
        self.pending
    }

    /// Raw progress in [0, 1).
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Eased mix factor the composite uses.
    pub fn blend(&self) -> f32 {
        smoothstep(0.0, 1.0, self.progress)
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn set_duration(&mut self, duration: f32) {
        self.rate = rate_for(duration);
    }

    pub fn switch_to(&mut self, id: SceneId) -> SwitchOutcome {
        if !self.transitioning {
            if id == self.active {
                return SwitchOutcome::Ignored;
            }
            self.pending = id;
            self.progress = 0.0;
            self.transitioning = true;
            return SwitchOutcome::Started;
        }
        self.pending = id;
        self.progress = 0.0;
        SwitchOutcome::Redirected
    }

    /// Advances the blend by `dt` seconds. Returns the world that just
    /// became active when the blend completes on this tick.
    pub fn tick(&mut self, dt: f32) -> Option<SceneId> {
        if !self.transitioning {
            return None;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.progress += dt * self.rate;
        if self.progress < 1.0 {
            return None;
        }
        self.active = self.pending;
        self.progress = 0.0;
        self.transitioning = false;
        Some(self.active)
    }
}

fn rate_for(duration: f32) -> f32 {
    if duration.is_finite() && duration > 0.0 {
        duration.recip()
    } else {
        log::warn!("ignoring transition duration {duration}, using 0.5s");
        2.0
    }
}
