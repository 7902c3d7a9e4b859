//! Synthwave city: horizon sun, rippling grid floor, wireframe towers and
//! drifting sparks, all scrolling toward the camera forever.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Quat, Vec2, Vec3};
use rand::rngs::SmallRng;
use rand::Rng;

use crate::camera::Camera;
use crate::config::{EngineOptions, Palette, PhysicsTuning, ThemeConfig};
use crate::error::GpuError;
use crate::gpu::{
    geometry, Blend, DepthMode, DrawCall, Gpu, MeshId, ProgramId, Uniform, MATRIX_INSTANCES,
};
use crate::physics::DragFollower;
use crate::pointer::PointerSample;

use super::{camera_uniforms, mat4, shaders, vec3, SceneId, World};

const GRID_HALF_SPAN: f32 = 150.0;
const FOG_RANGE: Uniform = Uniform::Vec2([20.0, 180.0]);
const SUN_POSITION: Vec3 = Vec3::new(0.0, 15.0, -120.0);

const BUILDINGS: usize = 20;
/// Towers past this depth jump back by `CHUNK_LENGTH`.
const BUILDING_WRAP_Z: f32 = 40.0;
const CHUNK_LENGTH: f32 = 250.0;

const PARTICLES: usize = 60;
const PARTICLE_WRAP_Z: f32 = 50.0;
const PARTICLE_RESPAWN_Z: f32 = -150.0;
const PARTICLE_SCALE: f32 = 0.15;

const STARS: usize = 2_000;
const STAR_RADIUS: f32 = 150.0;
const STAR_DEPTH: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Building {
    x: f32,
    z: f32,
    height: f32,
    width: f32,
    depth: f32,
}

impl Building {
    fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::new(self.width, self.height, self.depth),
            Quat::IDENTITY,
            Vec3::new(self.x, self.height / 2.0 - 10.0, self.z),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Spark {
    position: Vec3,
    speed: f32,
}

struct CityGpu {
    flat: ProgramId,
    instanced: ProgramId,
    sun: ProgramId,
    grid: ProgramId,
    stars: ProgramId,
    halo_mesh: MeshId,
    sun_mesh: MeshId,
    grid_mesh: MeshId,
    building_mesh: MeshId,
    spark_mesh: MeshId,
    star_mesh: MeshId,
}

pub struct CityWorld {
    palette: Palette,
    physics: PhysicsTuning,
    time: f64,
    mouse: DragFollower,
    buildings: Vec<Building>,
    sparks: Vec<Spark>,
    stars: Vec<[f32; 3]>,
    scratch: Vec<f32>,
    gpu: Option<CityGpu>,
}

impl CityWorld {
    pub fn new(theme: &ThemeConfig, options: &EngineOptions, mut rng: SmallRng) -> Self {
        let buildings = (0..options.scaled(BUILDINGS))
            .map(|i| {
                let side = if i % 2 == 0 { -1.0 } else { 1.0 };
                Building {
                    x: side * rng.random_range(25.0..120.0),
                    z: rng.random_range(-200.0..50.0),
                    height: rng.random_range(20.0..100.0),
                    width: rng.random_range(5.0..15.0),
                    depth: rng.random_range(5.0..15.0),
                }
            })
            .collect();
        let sparks = (0..options.scaled(PARTICLES))
            .map(|_| Spark {
                position: Vec3::new(
                    rng.random_range(-100.0..100.0),
                    rng.random_range(0.0..60.0),
                    rng.random_range(-150.0..50.0),
                ),
                speed: rng.random_range(0.2..0.8),
            })
            .collect();
        let stars = (0..options.scaled(STARS))
            .map(|_| {
                let r = STAR_RADIUS + rng.random_range(0.0..STAR_DEPTH);
                let u: f32 = rng.random_range(-1.0..1.0);
                let phi: f32 = rng.random_range(0.0..std::f32::consts::TAU);
                let ring = (1.0 - u * u).sqrt();
                [r * ring * phi.cos(), r * u, r * ring * phi.sin()]
            })
            .collect();
        Self {
            palette: theme.palette,
            physics: theme.physics,
            time: 0.0,
            mouse: DragFollower::at(Vec2::ZERO),
            buildings,
            sparks,
            stars,
            scratch: Vec::new(),
            gpu: None,
        }
    }

    /// Damped cursor on the grid floor (world x, z).
    pub fn grid_mouse(&self) -> Vec2 {
        self.mouse.position
    }

    pub fn building_depths(&self) -> impl Iterator<Item = f32> + '_ {
        self.buildings.iter().map(|b| b.z)
    }

    pub fn particle_depths(&self) -> impl Iterator<Item = f32> + '_ {
        self.sparks.iter().map(|s| s.position.z)
    }

    fn fog(&self) -> [(&'static str, Uniform); 2] {
        [
            ("u_fog_color", vec3(self.palette.background)),
            ("u_fog_range", FOG_RANGE),
        ]
    }
}

impl World for CityWorld {
    fn id(&self) -> SceneId {
        SceneId::City
    }

    fn prepare(&mut self, gpu: &mut dyn Gpu) -> Result<(), GpuError> {
        self.gpu = Some(CityGpu {
            flat: gpu.compile(&shaders::FLAT)?,
            instanced: gpu.compile(&shaders::FLAT_INSTANCED)?,
            sun: gpu.compile(&shaders::SUN)?,
            grid: gpu.compile(&shaders::GRID)?,
            stars: gpu.compile(&shaders::STARS)?,
            halo_mesh: gpu.upload_mesh(&geometry::circle(45.0, 64))?,
            sun_mesh: gpu.upload_mesh(&geometry::circle(30.0, 64))?,
            grid_mesh: gpu.upload_mesh(&geometry::plane_grid(300.0, 300.0, 64, 64))?,
            building_mesh: gpu.upload_mesh(&geometry::box_edges())?,
            spark_mesh: gpu.upload_mesh(&geometry::unit_box())?,
            star_mesh: gpu.upload_mesh(&geometry::points(self.stars.clone()))?,
        });
        Ok(())
    }

    fn advance(&mut self, dt: f32, pointer: &PointerSample, paused: bool) {
        if paused {
            return;
        }
        self.time += f64::from(dt);

        let target = pointer.viewport.to_world_span(pointer.position, GRID_HALF_SPAN);
        let gain = (1.0 - self.physics.viscosity) * self.physics.cursor_force * 5.0;
        self.mouse.step(target, gain);

        let travel = self.physics.speed * 40.0 * dt;
        for building in &mut self.buildings {
            building.z += travel;
            if building.z > BUILDING_WRAP_Z {
                building.z -= CHUNK_LENGTH;
            }
        }

        // Sparks were tuned per 60 Hz frame.
        let frames = dt * 60.0;
        for spark in &mut self.sparks {
            spark.position.z += spark.speed * self.physics.speed * 60.0 * frames;
            if spark.position.z > PARTICLE_WRAP_Z {
                spark.position.z = PARTICLE_RESPAWN_Z;
            }
        }
    }

    fn draw(&mut self, gpu: &mut dyn Gpu, camera: &Camera) -> Result<(), GpuError> {
        let res = self.gpu.as_ref().ok_or(GpuError::Resource("city programs"))?;
        let [projection, view] = camera_uniforms(camera);
        let [fog_color, fog_range] = self.fog();
        let time = Uniform::F32(self.time as f32);

        self.scratch.clear();
        for spark in &self.sparks {
            let m = Mat4::from_scale_rotation_translation(
                Vec3::splat(PARTICLE_SCALE),
                Quat::IDENTITY,
                spark.position,
            );
            self.scratch.extend_from_slice(&m.to_cols_array());
        }
        gpu.upload_instances(res.spark_mesh, &MATRIX_INSTANCES, &self.scratch)?;
        let uniforms = [
            projection,
            view,
            ("u_model", mat4(Mat4::IDENTITY)),
            ("u_color", vec3(self.palette.accent)),
            ("u_opacity", Uniform::F32(1.0)),
            fog_color,
            fog_range,
        ];
        gpu.draw(
            &DrawCall::new(res.instanced, res.spark_mesh, &uniforms)
                .instanced(self.sparks.len() as u32),
        )?;

        let uniforms = [
            projection,
            view,
            ("u_model", mat4(Mat4::IDENTITY)),
            ("u_time", time),
            ("u_size", Uniform::F32(4.0)),
        ];
        gpu.draw(
            &DrawCall::new(res.stars, res.star_mesh, &uniforms)
                .blend(Blend::Alpha)
                .depth(DepthMode::ReadOnly),
        )?;

        let uniforms = [
            projection,
            view,
            ("u_model", mat4(Mat4::from_translation(SUN_POSITION - Vec3::Z))),
            ("u_color", vec3(self.palette.accent)),
            ("u_opacity", Uniform::F32(0.15)),
            fog_color,
            fog_range,
        ];
        gpu.draw(
            &DrawCall::new(res.flat, res.halo_mesh, &uniforms)
                .blend(Blend::Alpha)
                .depth(DepthMode::ReadOnly),
        )?;

        let uniforms = [
            projection,
            view,
            ("u_model", mat4(Mat4::from_translation(SUN_POSITION))),
            ("u_color_top", vec3(self.palette.secondary)),
            ("u_color_bottom", vec3(self.palette.accent)),
            ("u_time", time),
            ("u_opacity", Uniform::F32(0.6)),
        ];
        gpu.draw(&DrawCall::new(res.sun, res.sun_mesh, &uniforms).blend(Blend::Alpha))?;

        let floor = Mat4::from_translation(Vec3::new(0.0, -10.0, 0.0))
            * Mat4::from_rotation_x(-FRAC_PI_2);
        let uniforms = [
            projection,
            view,
            ("u_model", mat4(floor)),
            ("u_time", time),
            ("u_mouse", Uniform::Vec2(self.mouse.position.to_array())),
            ("u_speed", Uniform::F32(self.physics.speed)),
            ("u_opacity", Uniform::F32(0.6)),
            ("u_color_grid", vec3(self.palette.secondary)),
            ("u_color_floor", vec3(self.palette.background)),
            ("u_color_pulse", vec3(self.palette.accent)),
        ];
        gpu.draw(
            &DrawCall::new(res.grid, res.grid_mesh, &uniforms)
                .blend(Blend::Alpha)
                .depth(DepthMode::ReadOnly),
        )?;

        self.scratch.clear();
        for building in &self.buildings {
            self.scratch
                .extend_from_slice(&building.transform().to_cols_array());
        }
        gpu.upload_instances(res.building_mesh, &MATRIX_INSTANCES, &self.scratch)?;
        let uniforms = [
            projection,
            view,
            ("u_model", mat4(Mat4::IDENTITY)),
            ("u_color", vec3(self.palette.secondary)),
            ("u_opacity", Uniform::F32(0.2)),
            fog_color,
            fog_range,
        ];
        gpu.draw(
            &DrawCall::new(res.instanced, res.building_mesh, &uniforms)
                .instanced(self.buildings.len() as u32)
                .blend(Blend::Alpha)
                .depth(DepthMode::ReadOnly),
        )
    }

    fn sim_time(&self) -> f64 {
        self.time
    }
}
