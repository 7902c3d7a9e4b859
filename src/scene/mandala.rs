//! Golden mandala: concentric rings of lit instances turning around a
//! glowing core, opening up as the cursor nears the centre of the screen.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

use crate::camera::Camera;
use crate::color::Rgb;
use crate::config::{Palette, PhysicsTuning, ThemeConfig};
use crate::error::GpuError;
use crate::gpu::{geometry, DrawCall, Gpu, MeshData, MeshId, ProgramId, Uniform, MATRIX_INSTANCES};
use crate::physics::lerp;
use crate::pointer::PointerSample;

use super::{camera_uniforms, mat4, shaders, vec3, SceneId, World};

const GROUP_SCALE: f32 = 1.5;
const MAX_TILT: f32 = 0.6;
const LIGHT_POSITION: Vec3 = Vec3::new(0.0, 0.0, 5.0);
const LIGHT_INTENSITY: f32 = 2.0;
const LIGHT_DISTANCE: f32 = 20.0;
const AMBIENT: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Petal,
    Orb,
    Hoop,
}

impl Shape {
    fn mesh(self) -> MeshData {
        match self {
            Shape::Petal => geometry::cone(0.5, 1.5, 4),
            Shape::Orb => geometry::sphere(0.3, 16, 16),
            Shape::Hoop => geometry::torus(0.4, 0.1, 8, 24),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Ring {
    count: usize,
    radius: f32,
    scale: f32,
    z: f32,
    shape: Shape,
    accent: bool,
    /// Radians per second at rest.
    speed: f32,
}

#[rustfmt::skip]
const RINGS: [Ring; 4] = [
    Ring { count: 8, radius: 2.5, scale: 1.0, z: 0.0, shape: Shape::Petal, accent: false, speed: 0.2 },
    Ring { count: 16, radius: 4.0, scale: 0.6, z: -0.5, shape: Shape::Orb, accent: true, speed: -0.15 },
    Ring { count: 24, radius: 6.0, scale: 0.8, z: -1.0, shape: Shape::Petal, accent: false, speed: 0.1 },
    Ring { count: 12, radius: 8.0, scale: 1.5, z: -2.0, shape: Shape::Hoop, accent: true, speed: -0.05 },
];

impl Ring {
    /// Ring radius once `bloom` (0..1) has opened it up.
    fn radius(&self, bloom: f32) -> f32 {
        self.radius + bloom * 2.0
    }

    fn rotation(&self, time: f32, bloom: f32) -> f32 {
        time * self.speed * (1.0 + bloom * 2.0)
    }

    fn write_instances(&self, time: f32, bloom: f32, out: &mut Vec<f32>) {
        let radius = self.radius(bloom);
        let rotation = self.rotation(time, bloom);
        for i in 0..self.count {
            let angle = i as f32 / self.count as f32 * TAU + rotation;
            let position = Vec3::new(angle.cos() * radius, angle.sin() * radius, self.z);
            let orientation = Quat::from_euler(EulerRot::XYZ, -FRAC_PI_2, 0.0, angle - FRAC_PI_2);
            let pulse = 1.0 + (time * 2.0 + i as f32).sin() * 0.1;
            let m = Mat4::from_scale_rotation_translation(
                Vec3::splat(self.scale * pulse),
                orientation,
                position,
            );
            out.extend_from_slice(&m.to_cols_array());
        }
    }
}

/// 1 at screen centre, falling to 0 two thirds of the way to the edge.
fn bloom(ndc: Vec2) -> f32 {
    (1.0 - ndc.length() * 1.5).max(0.0)
}

struct MandalaGpu {
    lit: ProgramId,
    core: MeshId,
    rings: [MeshId; 4],
}

pub struct MandalaWorld {
    palette: Palette,
    physics: PhysicsTuning,
    time: f64,
    bloom: f32,
    /// Group rotation about x and y.
    tilt: Vec2,
    scratch: Vec<f32>,
    gpu: Option<MandalaGpu>,
}

impl MandalaWorld {
    pub fn new(theme: &ThemeConfig) -> Self {
        Self {
            palette: theme.palette,
            physics: theme.physics,
            time: 0.0,
            bloom: 0.0,
            tilt: Vec2::ZERO,
            scratch: Vec::new(),
            gpu: None,
        }
    }

    pub fn tilt(&self) -> Vec2 {
        self.tilt
    }

    /// Current radius of each ring, innermost first.
    pub fn ring_radii(&self) -> [f32; 4] {
        RINGS.map(|ring| ring.radius(self.bloom))
    }

    fn group(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(GROUP_SCALE),
            Quat::from_euler(EulerRot::XYZ, self.tilt.x, self.tilt.y, 0.0),
            Vec3::ZERO,
        )
    }

    fn ring_color(&self, ring: &Ring) -> Rgb {
        if ring.accent {
            self.palette.accent
        } else {
            self.palette.secondary
        }
    }
}

impl World for MandalaWorld {
    fn id(&self) -> SceneId {
        SceneId::Mandala
    }

    fn prepare(&mut self, gpu: &mut dyn Gpu) -> Result<(), GpuError> {
        let lit = gpu.compile(&shaders::LIT)?;
        let core = gpu.upload_mesh(&geometry::sphere(1.0, 32, 32))?;
        gpu.upload_instances(core, &MATRIX_INSTANCES, &Mat4::IDENTITY.to_cols_array())?;
        let mut rings = [core; 4];
        for (slot, ring) in rings.iter_mut().zip(RINGS.iter()) {
            *slot = gpu.upload_mesh(&ring.shape.mesh())?;
        }
        self.gpu = Some(MandalaGpu { lit, core, rings });
        Ok(())
    }

    fn advance(&mut self, dt: f32, pointer: &PointerSample, paused: bool) {
        if paused {
            return;
        }
        self.time += f64::from(dt);

        let ndc = pointer.ndc();
        self.bloom = bloom(ndc);

        let reach = MAX_TILT * self.physics.cursor_force * 3.0;
        let target = Vec2::new(ndc.y * reach, ndc.x * reach);
        let follow = (1.0 - self.physics.viscosity) * 0.5;
        self.tilt.x = lerp(self.tilt.x, target.x, follow);
        self.tilt.y = lerp(self.tilt.y, target.y, follow);
    }

    fn draw(&mut self, gpu: &mut dyn Gpu, camera: &Camera) -> Result<(), GpuError> {
        let res = self.gpu.as_ref().ok_or(GpuError::Resource("mandala programs"))?;
        let [projection, view] = camera_uniforms(camera);
        let group = self.group();
        let light = [
            ("u_eye", Uniform::Vec3(camera.eye.to_array())),
            (
                "u_light_position",
                Uniform::Vec3(group.transform_point3(LIGHT_POSITION).to_array()),
            ),
            ("u_light_color", vec3(self.palette.accent)),
            ("u_light_intensity", Uniform::F32(LIGHT_INTENSITY)),
            ("u_light_distance", Uniform::F32(LIGHT_DISTANCE)),
            ("u_ambient", Uniform::F32(AMBIENT)),
        ];

        let uniforms = [
            projection,
            view,
            ("u_model", mat4(group)),
            ("u_color", vec3(self.palette.accent)),
            ("u_emissive", vec3(self.palette.secondary)),
            ("u_emissive_intensity", Uniform::F32(0.5)),
            ("u_metalness", Uniform::F32(0.0)),
            ("u_roughness", Uniform::F32(1.0)),
            light[0],
            light[1],
            light[2],
            light[3],
            light[4],
            light[5],
        ];
        gpu.draw(&DrawCall::new(res.lit, res.core, &uniforms).instanced(1))?;

        let time = self.time as f32;
        for (ring, &mesh) in RINGS.iter().zip(res.rings.iter()) {
            self.scratch.clear();
            ring.write_instances(time, self.bloom, &mut self.scratch);
            gpu.upload_instances(mesh, &MATRIX_INSTANCES, &self.scratch)?;
            let color = self.ring_color(ring);
            let uniforms = [
                projection,
                view,
                ("u_model", mat4(group)),
                ("u_color", vec3(color)),
                ("u_emissive", vec3(color)),
                ("u_emissive_intensity", Uniform::F32(0.2)),
                ("u_metalness", Uniform::F32(0.8)),
                ("u_roughness", Uniform::F32(0.2)),
                light[0],
                light[1],
                light[2],
                light[3],
                light[4],
                light[5],
            ];
            gpu.draw(&DrawCall::new(res.lit, mesh, &uniforms).instanced(ring.count as u32))?;
        }
        Ok(())
    }

    fn sim_time(&self) -> f64 {
        self.time
    }
}
