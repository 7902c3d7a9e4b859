//! The five generative worlds and the handle the vault keeps for each.

pub mod city;
pub mod flow;
pub mod fluid;
pub mod mandala;
pub mod rain;
pub mod shaders;

use std::fmt;

use glam::Mat4;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::camera::Camera;
use crate::color::Rgb;
use crate::config::{EngineOptions, ThemeConfig};
use crate::error::GpuError;
use crate::gpu::{Gpu, Uniform};
use crate::pointer::PointerSample;

/// Closed set of worlds. The discriminant doubles as the vault index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SceneId {
    Fluid = 0,
    City = 1,
    Flow = 2,
    Rain = 3,
    Mandala = 4,
}

impl SceneId {
    pub const COUNT: usize = 5;
    pub const ALL: [SceneId; SceneId::COUNT] = [
        SceneId::Fluid,
        SceneId::City,
        SceneId::Flow,
        SceneId::Rain,
        SceneId::Mandala,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Out-of-range indices resolve to the default world.
    pub fn from_index(index: usize) -> SceneId {
        SceneId::ALL.get(index).copied().unwrap_or(SceneId::Fluid)
    }

    /// Theme id used by the settings layer.
    pub fn key(self) -> &'static str {
        match self {
            SceneId::Fluid => "default",
            SceneId::City => "cyberpunk",
            SceneId::Flow => "sakura",
            SceneId::Rain => "lofi",
            SceneId::Mandala => "royal",
        }
    }

    pub fn from_key(key: &str) -> Option<SceneId> {
        SceneId::ALL.into_iter().find(|id| id.key() == key)
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A self-contained simulation plus the GPU resources that draw it.
pub trait World {
    fn id(&self) -> SceneId;

    /// Compiles programs and uploads static geometry. Called once, eagerly,
    /// when the vault is built.
    fn prepare(&mut self, gpu: &mut dyn Gpu) -> Result<(), GpuError>;

    /// Steps the simulation by `dt` seconds. Does nothing while `paused`.
    fn advance(&mut self, dt: f32, pointer: &PointerSample, paused: bool);

    /// Issues draw calls into whatever target is bound.
    fn draw(&mut self, gpu: &mut dyn Gpu, camera: &Camera) -> Result<(), GpuError>;

    /// Seconds of simulated time; only moves forward.
    fn sim_time(&self) -> f64;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneStatus {
    Ready,
    /// Drawn as a flat fill of the theme background.
    Fallback(GpuError),
}

/// One resident world. Never rebuilt once the vault owns it.
pub struct SceneHandle {
    id: SceneId,
    theme: ThemeConfig,
    world: Box<dyn World>,
    status: SceneStatus,
}

impl SceneHandle {
    /// Builds the world for `id` and warms it up on `gpu`. A world that
    /// fails to prepare is kept, but marked as a fallback.
    pub fn build(
        id: SceneId,
        theme: ThemeConfig,
        options: &EngineOptions,
        gpu: &mut dyn Gpu,
    ) -> Self {
        let world = new_world(id, &theme, options);
        Self::with_world(theme, world, gpu)
    }

    pub fn with_world(theme: ThemeConfig, mut world: Box<dyn World>, gpu: &mut dyn Gpu) -> Self {
        let id = world.id();
        let status = match world.prepare(gpu) {
            Ok(()) => {
                log::info!("warmed up `{id}` ({})", theme.name);
                SceneStatus::Ready
            }
            Err(err) => {
                log::error!("`{id}` failed warm-up, drawing flat fallback: {err}");
                SceneStatus::Fallback(err)
            }
        };
        Self {
            id,
            theme,
            world,
            status,
        }
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn theme(&self) -> &ThemeConfig {
        &self.theme
    }

    pub fn background(&self) -> Rgb {
        self.theme.palette.background
    }

    pub fn status(&self) -> &SceneStatus {
        &self.status
    }

    pub fn sim_time(&self) -> f64 {
        self.world.sim_time()
    }

    pub fn advance(&mut self, dt: f32, pointer: &PointerSample, paused: bool) {
        self.world.advance(dt, pointer, paused);
    }

    /// Draws into the bound target, which the caller has already cleared to
    /// [`Self::background`]. A runtime draw failure demotes the handle to
    /// the fallback for the rest of its life.
    pub fn draw(&mut self, gpu: &mut dyn Gpu, camera: &Camera) {
        if let SceneStatus::Fallback(_) = self.status {
            gpu.clear(self.background(), 1.0);
            return;
        }
        if let Err(err) = self.world.draw(gpu, camera) {
            log::error!("`{}` failed to draw, switching to fallback: {err}", self.id);
            self.status = SceneStatus::Fallback(err);
            gpu.clear(self.background(), 1.0);
        }
    }
}

impl fmt::Debug for SceneHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneHandle")
            .field("id", &self.id)
            .field("theme", &self.theme.name)
            .field("status", &self.status)
            .field("sim_time", &self.world.sim_time())
            .finish()
    }
}

fn new_world(id: SceneId, theme: &ThemeConfig, options: &EngineOptions) -> Box<dyn World> {
    let rng = SmallRng::seed_from_u64(options.seed ^ (id.index() as u64 + 1) * 0x9e37_79b9);
    match id {
        SceneId::Fluid => Box::new(fluid::FluidWorld::new(theme)),
        SceneId::City => Box::new(city::CityWorld::new(theme, options, rng)),
        SceneId::Flow => Box::new(flow::FlowWorld::new(theme, options, rng)),
        SceneId::Rain => Box::new(rain::RainWorld::new(theme, options, rng)),
        SceneId::Mandala => Box::new(mandala::MandalaWorld::new(theme)),
    }
}

/// Projection and view uniforms every 3D world binds.
pub(crate) fn camera_uniforms(camera: &Camera) -> [(&'static str, Uniform); 2] {
    [
        ("u_projection", Uniform::Mat4(camera.projection().to_cols_array())),
        ("u_view", Uniform::Mat4(camera.view().to_cols_array())),
    ]
}

pub(crate) fn mat4(m: Mat4) -> Uniform {
    Uniform::Mat4(m.to_cols_array())
}

pub(crate) fn vec3(c: Rgb) -> Uniform {
    Uniform::Vec3(c.to_array())
}

/// Fog range that never kicks in.
pub(crate) const NO_FOG: Uniform = Uniform::Vec2([1.0e6, 2.0e6]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_and_bad_index_falls_back() {
        for id in SceneId::ALL {
            assert_eq!(SceneId::from_key(id.key()), Some(id));
            assert_eq!(SceneId::from_index(id.index()), id);
        }
        assert_eq!(SceneId::from_index(17), SceneId::Fluid);
        assert_eq!(SceneId::from_key("vaporwave"), None);
    }
}
