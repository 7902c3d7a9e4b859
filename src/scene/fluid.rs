//! Full-screen domain-warped noise field with a spring-damped cursor.

use glam::Vec2;

use crate::camera::Camera;
use crate::config::{Palette, PhysicsTuning, ThemeConfig};
use crate::error::GpuError;
use crate::gpu::{geometry, DepthMode, DrawCall, Gpu, MeshId, ProgramId, Uniform};
use crate::physics::SpringFollower;
use crate::pointer::PointerSample;

use super::{shaders, vec3, SceneId, World};

/// The accent is toned down before it reaches the warp.
const ACCENT_SCALE: f32 = 0.7;

pub struct FluidWorld {
    palette: Palette,
    physics: PhysicsTuning,
    time: f64,
    mouse: SpringFollower,
    resolution: Vec2,
    gpu: Option<(ProgramId, MeshId)>,
}

impl FluidWorld {
    pub fn new(theme: &ThemeConfig) -> Self {
        Self {
            palette: theme.palette,
            physics: theme.physics,
            time: 0.0,
            mouse: SpringFollower::at(Vec2::splat(0.5)),
            resolution: Vec2::ONE,
            gpu: None,
        }
    }

    /// Damped cursor in uv space, y up.
    pub fn mouse(&self) -> Vec2 {
        self.mouse.position
    }
}

impl World for FluidWorld {
    fn id(&self) -> SceneId {
        SceneId::Fluid
    }

    fn prepare(&mut self, gpu: &mut dyn Gpu) -> Result<(), GpuError> {
        let program = gpu.compile(&shaders::FLUID)?;
        let quad = gpu.upload_mesh(&geometry::quad(2.0, 2.0))?;
        self.gpu = Some((program, quad));
        Ok(())
    }

    fn advance(&mut self, dt: f32, pointer: &PointerSample, paused: bool) {
        if paused {
            return;
        }
        self.time += f64::from(dt);
        self.resolution = Vec2::new(
            pointer.viewport.width as f32,
            pointer.viewport.height as f32,
        );
        self.mouse
            .step(pointer.uv(), self.physics.cursor_force, self.physics.viscosity);
    }

    fn draw(&mut self, gpu: &mut dyn Gpu, _camera: &Camera) -> Result<(), GpuError> {
        let (program, quad) = self.gpu.ok_or(GpuError::Resource("fluid program"))?;
        let uniforms = [
            ("u_time", Uniform::F32(self.time as f32)),
            ("u_resolution", Uniform::Vec2(self.resolution.to_array())),
            ("u_mouse", Uniform::Vec2(self.mouse.position.to_array())),
            ("u_accent", vec3(self.palette.accent.scale(ACCENT_SCALE))),
            ("u_background", vec3(self.palette.background)),
            ("u_turbulence", Uniform::F32(self.physics.turbulence)),
        ];
        gpu.draw(&DrawCall::new(program, quad, &uniforms).depth(DepthMode::Off))
    }

    fn sim_time(&self) -> f64 {
        self.time
    }
}
