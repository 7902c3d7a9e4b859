//! Blossom storm: tens of thousands of petals falling through a noise flow
//! field, scattered by a cursor raycast onto the z = 0 plane.
//!
//! Petal motion is evaluated entirely in the vertex shader from the
//! static per-instance attributes and the world clock, so the CPU side only
//! tracks time, the damped cursor and its interaction radius.

use glam::{Mat4, Vec3};
use rand::rngs::SmallRng;
use rand::Rng;

use crate::camera::Camera;
use crate::color::Rgb;
use crate::config::{EngineOptions, Palette, PhysicsTuning, ThemeConfig};
use crate::error::GpuError;
use crate::gpu::{
    geometry, Blend, DepthMode, DrawCall, Gpu, InstanceAttribute, InstanceLayout, MeshId,
    ProgramId, Uniform,
};
use crate::physics::lerp;
use crate::pointer::PointerSample;

use super::{camera_uniforms, mat4, shaders, vec3, SceneId, World, NO_FOG};

/// offset (3), scale, fall speed, spin speed, color (3).
const PETAL_INSTANCES: InstanceLayout = InstanceLayout {
    attributes: &[
        InstanceAttribute { location: 3, components: 3 },
        InstanceAttribute { location: 4, components: 1 },
        InstanceAttribute { location: 5, components: 1 },
        InstanceAttribute { location: 6, components: 1 },
        InstanceAttribute { location: 7, components: 3 },
    ],
};

const PETAL_COLORS: [Rgb; 4] = [
    Rgb::from_rgb8(0xff, 0xc1, 0xcc),
    Rgb::from_rgb8(0xff, 0xb7, 0xb2),
    Rgb::from_rgb8(0xff, 0xda, 0xc1),
    Rgb::from_rgb8(0xff, 0xe5, 0xe5),
];

const VERTICAL_SPEED: f32 = 15.0;
const WIND_SPEED: f32 = 0.3;

const INITIAL_RADIUS: f32 = 100.0;
const MAX_RADIUS: f32 = 500.0;
/// Per-axis cap on how much cursor speed can widen the radius.
const MAX_SPEED_BOOST: f32 = 50.0;
const RADIUS_SMOOTHING: f32 = 0.1;

const BACKDROP_Z: f32 = -80.0;

struct FlowGpu {
    petals: ProgramId,
    flat: ProgramId,
    petal_mesh: MeshId,
    backdrop_mesh: MeshId,
}

pub struct FlowWorld {
    palette: Palette,
    physics: PhysicsTuning,
    time: f64,
    mouse_world: Vec3,
    radius: f32,
    instances: Vec<f32>,
    gpu: Option<FlowGpu>,
}

impl FlowWorld {
    pub fn new(theme: &ThemeConfig, options: &EngineOptions, mut rng: SmallRng) -> Self {
        let count = options.scaled(options.petal_count);
        let mut instances = Vec::with_capacity(count * PETAL_INSTANCES.stride());
        for _ in 0..count {
            let color = PETAL_COLORS[rng.random_range(0..PETAL_COLORS.len())];
            instances.extend_from_slice(&[
                rng.random_range(-150.0..150.0),
                rng.random_range(-75.0..75.0),
                rng.random_range(-80.0..-10.0),
                rng.random_range(0.4..0.8),
                rng.random_range(0.5..1.2),
                rng.random_range(0.5..2.0),
                color.r,
                color.g,
                color.b,
            ]);
        }
        Self {
            palette: theme.palette,
            physics: theme.physics,
            time: 0.0,
            mouse_world: Vec3::splat(1000.0),
            radius: INITIAL_RADIUS,
            instances,
            gpu: None,
        }
    }

    /// Current interaction radius in world units.
    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn mouse_world(&self) -> Vec3 {
        self.mouse_world
    }

    pub fn petal_count(&self) -> usize {
        PETAL_INSTANCES.instance_count(&self.instances)
    }
}

impl World for FlowWorld {
    fn id(&self) -> SceneId {
        SceneId::Flow
    }

    fn prepare(&mut self, gpu: &mut dyn Gpu) -> Result<(), GpuError> {
        let petals = gpu.compile(&shaders::PETALS)?;
        let flat = gpu.compile(&shaders::FLAT)?;
        let petal_mesh = gpu.upload_mesh(&geometry::quad(1.0, 1.0))?;
        gpu.upload_instances(petal_mesh, &PETAL_INSTANCES, &self.instances)?;
        let backdrop_mesh = gpu.upload_mesh(&geometry::quad(1000.0, 1000.0))?;
        self.gpu = Some(FlowGpu {
            petals,
            flat,
            petal_mesh,
            backdrop_mesh,
        });
        Ok(())
    }

    fn advance(&mut self, dt: f32, pointer: &PointerSample, paused: bool) {
        if paused {
            return;
        }
        self.time += f64::from(dt);

        let camera = Camera::new(pointer.viewport);
        // Off-plane rays keep the last cursor and radius.
        let Some(hit) = camera.unproject_to_plane(pointer.ndc(), 0.0) else {
            return;
        };
        let follow = ((1.0 - self.physics.viscosity) * 2.0).clamp(0.0, 1.0);
        self.mouse_world.x = lerp(self.mouse_world.x, hit.x, follow);
        self.mouse_world.y = lerp(self.mouse_world.y, hit.y, follow);

        let boost = pointer.velocity.x.abs().min(MAX_SPEED_BOOST)
            + pointer.velocity.y.abs().min(MAX_SPEED_BOOST);
        let target = (self.physics.influence_radius + boost * 0.5).min(MAX_RADIUS);
        self.radius = lerp(self.radius, target, RADIUS_SMOOTHING);
    }

    fn draw(&mut self, gpu: &mut dyn Gpu, camera: &Camera) -> Result<(), GpuError> {
        let res = self.gpu.as_ref().ok_or(GpuError::Resource("flow programs"))?;
        let [projection, view] = camera_uniforms(camera);

        let uniforms = [
            projection,
            view,
            ("u_model", mat4(Mat4::from_translation(Vec3::Z * BACKDROP_Z))),
            ("u_color", vec3(self.palette.background)),
            ("u_opacity", Uniform::F32(1.0)),
            ("u_fog_color", vec3(self.palette.background)),
            ("u_fog_range", NO_FOG),
        ];
        gpu.draw(&DrawCall::new(res.flat, res.backdrop_mesh, &uniforms))?;

        let uniforms = [
            projection,
            view,
            ("u_time", Uniform::F32(self.time as f32)),
            ("u_vertical_speed", Uniform::F32(VERTICAL_SPEED)),
            ("u_wind_speed", Uniform::F32(WIND_SPEED)),
            ("u_turbulence", Uniform::F32(self.physics.turbulence)),
            ("u_mouse_world", Uniform::Vec3(self.mouse_world.to_array())),
            ("u_mouse_radius", Uniform::F32(self.radius)),
        ];
        gpu.draw(
            &DrawCall::new(res.petals, res.petal_mesh, &uniforms)
                .instanced(self.petal_count() as u32)
                .blend(Blend::Additive)
                .depth(DepthMode::ReadOnly),
        )
    }

    fn sim_time(&self) -> f64 {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    use crate::gpu::headless::HeadlessGpu;
    use crate::physics::Viewport;
    use crate::pointer::PointerTracker;

    fn flow(options: &EngineOptions) -> FlowWorld {
        FlowWorld::new(
            &ThemeConfig::builtin(SceneId::Flow),
            options,
            SmallRng::seed_from_u64(3),
        )
    }

    #[test]
    fn resting_cursor_radius_settles_on_influence_radius() {
        let viewport = Viewport::new(1440, 900);
        let sample = PointerSample::at_rest(viewport);
        let mut world = flow(&EngineOptions::default());
        for _ in 0..300 {
            world.advance(1.0 / 60.0, &sample, false);
        }
        let base = ThemeConfig::builtin(SceneId::Flow).physics.influence_radius;
        assert!((world.radius() - base).abs() < 1e-3, "{}", world.radius());
        assert!(world.mouse_world().truncate().length() < 1e-3);
    }

    #[test]
    fn thin_theme_cursor_settles_instead_of_ringing() {
        let viewport = Viewport::new(800, 600);
        let mut tracker = PointerTracker::centered(viewport);
        tracker.record(700.0, 150.0);
        let sample = tracker.sample(viewport);
        let mut theme = ThemeConfig::builtin(SceneId::Flow);
        theme.physics.viscosity = 0.0;
        let mut world =
            FlowWorld::new(&theme, &EngineOptions::default(), SmallRng::seed_from_u64(3));
        world.advance(1.0 / 60.0, &sample, false);
        let settled = world.mouse_world();
        for _ in 0..10 {
            world.advance(1.0 / 60.0, &sample, false);
            assert!((world.mouse_world() - settled).length() < 1e-4);
        }
        assert!(settled.x > 0.0 && settled.y > 0.0);
    }

    #[test]
    fn fast_cursor_widens_radius_up_to_cap() {
        let viewport = Viewport::new(800, 600);
        let mut tracker = PointerTracker::centered(viewport);
        tracker.record(600.0, 500.0);
        let sample = tracker.sample(viewport);
        let mut world = flow(&EngineOptions::default());
        for _ in 0..300 {
            world.advance(1.0 / 60.0, &sample, false);
        }
        // both axes clamp to 50, adding 50 to the 300 base
        assert!((world.radius() - 350.0).abs() < 1e-2, "{}", world.radius());
    }

    #[test]
    fn density_controls_petal_count() {
        let options = EngineOptions {
            density: 0.01,
            ..EngineOptions::default()
        };
        let mut world = flow(&options);
        assert_eq!(world.petal_count(), 400);

        let mut gpu = HeadlessGpu::new();
        world.prepare(&mut gpu).unwrap();
        assert_eq!(gpu.instance_count(MeshId(0)), Some(400));
        let viewport = Viewport::new(320, 240);
        world.draw(&mut gpu, &Camera::new(viewport)).unwrap();
    }
}
