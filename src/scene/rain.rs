//! Late-night rain: falling streaks nudged aside by the cursor, over a
//! slowly drifting cluster of out-of-focus discs.

use glam::{Mat4, Quat, Vec2, Vec3};
use rand::rngs::SmallRng;
use rand::Rng;

use crate::camera::Camera;
use crate::color::Rgb;
use crate::config::{EngineOptions, Palette, PhysicsTuning, ThemeConfig};
use crate::error::GpuError;
use crate::gpu::{
    geometry, Blend, DepthMode, DrawCall, Gpu, MeshId, ProgramId, Uniform, MATRIX_INSTANCES,
};
use crate::physics::{lerp, DragFollower};
use crate::pointer::PointerSample;

use super::{camera_uniforms, mat4, shaders, vec3, SceneId, World};

const STREAKS: usize = 250;
const FIELD_HALF_SPAN: f32 = 50.0;
const FLOOR_Y: f32 = -30.0;
const RESPAWN_Y: f32 = 50.0;
const STREAK_THICKNESS: f32 = 0.05;
const FOG_RANGE: Uniform = Uniform::Vec2([5.0, 60.0]);

const BOKEH_DEPTH: f32 = -40.0;
const BOKEH_FOLLOW: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Streak {
    x: f32,
    y: f32,
    z: f32,
    velocity: f32,
    length: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tint {
    Background,
    Accent,
    Secondary,
}

/// One soft disc bobbing inside the bokeh group.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bokeh {
    offset: Vec3,
    radius: f32,
    tint: Tint,
    opacity: f32,
    speed: f32,
    rotation_intensity: f32,
    float_intensity: f32,
}

const BOKEH: [Bokeh; 3] = [
    Bokeh {
        offset: Vec3::new(-15.0, 5.0, 0.0),
        radius: 8.0,
        tint: Tint::Background,
        opacity: 0.3,
        speed: 1.0,
        rotation_intensity: 0.2,
        float_intensity: 0.5,
    },
    Bokeh {
        offset: Vec3::new(10.0, -5.0, -5.0),
        radius: 12.0,
        tint: Tint::Accent,
        opacity: 0.2,
        speed: 1.5,
        rotation_intensity: 0.1,
        float_intensity: 0.7,
    },
    Bokeh {
        offset: Vec3::new(0.0, 10.0, -2.0),
        radius: 6.0,
        tint: Tint::Secondary,
        opacity: 0.2,
        speed: 0.8,
        rotation_intensity: 0.3,
        float_intensity: 0.4,
    },
];

impl Bokeh {
    /// Local transform at `time`: a gentle bob and wobble around `offset`.
    fn transform(&self, time: f32) -> Mat4 {
        let phase = time / 4.0 * self.speed;
        let (s, c) = phase.sin_cos();
        let wobble = Quat::from_euler(
            glam::EulerRot::XYZ,
            c / 8.0 * self.rotation_intensity,
            s / 8.0 * self.rotation_intensity,
            s / 20.0 * self.rotation_intensity,
        );
        let bob = Vec3::Y * (s / 10.0 * self.float_intensity);
        Mat4::from_rotation_translation(wobble, self.offset + bob)
    }
}

/// Horizontal position of a streak at `(x, y)` after one step of being
/// shoved away from `cursor`. Streaks outside `reach` are left alone.
/// Nudges `x` away from the cursor. `frames` is the step length in 60 Hz
/// frames.
fn push_away(x: f32, y: f32, cursor: Vec2, reach: f32, cursor_force: f32, frames: f32) -> f32 {
    let dx = cursor.x - x;
    let dy = cursor.y - y;
    let dist = (dx * dx + dy * dy).sqrt() + 0.001;
    if dist >= reach {
        return x;
    }
    let force = (1.0 - dist / reach) * cursor_force * 40.0;
    let pushed = x - dx / dist * force * 0.1;
    lerp(x, pushed, (0.1 * frames).min(1.0))
}

struct RainGpu {
    flat: ProgramId,
    instanced: ProgramId,
    streak_mesh: MeshId,
    bokeh_meshes: [MeshId; 3],
}

pub struct RainWorld {
    palette: Palette,
    physics: PhysicsTuning,
    time: f64,
    streaks: Vec<Streak>,
    group: DragFollower,
    scratch: Vec<f32>,
    gpu: Option<RainGpu>,
}

impl RainWorld {
    pub fn new(theme: &ThemeConfig, options: &EngineOptions, mut rng: SmallRng) -> Self {
        let streaks = (0..options.scaled(STREAKS))
            .map(|_| Streak {
                x: rng.random_range(-50.0..50.0),
                y: rng.random_range(0.0..100.0),
                z: rng.random_range(-20.0..20.0),
                velocity: rng.random_range(0.2..0.5),
                length: rng.random_range(0.5..1.5),
            })
            .collect();
        Self {
            palette: theme.palette,
            physics: theme.physics,
            time: 0.0,
            streaks,
            group: DragFollower::at(Vec2::ZERO),
            scratch: Vec::new(),
            gpu: None,
        }
    }

    pub fn streak_heights(&self) -> impl Iterator<Item = f32> + '_ {
        self.streaks.iter().map(|s| s.y)
    }

    /// Offset of the bokeh cluster from its rest position.
    pub fn bokeh_offset(&self) -> Vec2 {
        self.group.position
    }

    fn tint(&self, tint: Tint) -> Rgb {
        match tint {
            Tint::Background => self.palette.background,
            Tint::Accent => self.palette.accent,
            Tint::Secondary => self.palette.secondary,
        }
    }

    fn group_transform(&self) -> Mat4 {
        let roll = (self.time as f32 * 0.05).sin() * 0.1;
        Mat4::from_translation(self.group.position.extend(BOKEH_DEPTH))
            * Mat4::from_rotation_z(roll)
    }
}

impl World for RainWorld {
    fn id(&self) -> SceneId {
        SceneId::Rain
    }

    fn prepare(&mut self, gpu: &mut dyn Gpu) -> Result<(), GpuError> {
        let flat = gpu.compile(&shaders::FLAT)?;
        let instanced = gpu.compile(&shaders::FLAT_INSTANCED)?;
        let streak_mesh = gpu.upload_mesh(&geometry::unit_box())?;
        let mut bokeh_meshes = [streak_mesh; 3];
        for (slot, bokeh) in bokeh_meshes.iter_mut().zip(BOKEH.iter()) {
            *slot = gpu.upload_mesh(&geometry::circle(bokeh.radius, 32))?;
        }
        self.gpu = Some(RainGpu {
            flat,
            instanced,
            streak_mesh,
            bokeh_meshes,
        });
        Ok(())
    }

    fn advance(&mut self, dt: f32, pointer: &PointerSample, paused: bool) {
        if paused {
            return;
        }
        self.time += f64::from(dt);
        // Fall speeds are per 60 Hz frame.
        let frames = dt * 60.0;

        let cursor = pointer.viewport.to_world_span(pointer.position, FIELD_HALF_SPAN);
        let reach = self.physics.influence_radius * 0.2;
        for streak in &mut self.streaks {
            streak.y -= streak.velocity * frames;
            if streak.y < FLOOR_Y {
                streak.y = RESPAWN_Y;
            }
            streak.x = push_away(
                streak.x,
                streak.y,
                cursor,
                reach,
                self.physics.cursor_force,
                frames,
            );
        }

        self.group.step(pointer.ndc() * 2.0, BOKEH_FOLLOW);
    }

    fn draw(&mut self, gpu: &mut dyn Gpu, camera: &Camera) -> Result<(), GpuError> {
        let res = self.gpu.as_ref().ok_or(GpuError::Resource("rain programs"))?;
        let [projection, view] = camera_uniforms(camera);
        let fog_color = ("u_fog_color", vec3(self.palette.background));
        let fog_range = ("u_fog_range", FOG_RANGE);

        let group = self.group_transform();
        let time = self.time as f32;
        for (bokeh, &mesh) in BOKEH.iter().zip(res.bokeh_meshes.iter()) {
            let uniforms = [
                projection,
                view,
                ("u_model", mat4(group * bokeh.transform(time))),
                ("u_color", vec3(self.tint(bokeh.tint))),
                ("u_opacity", Uniform::F32(bokeh.opacity)),
                fog_color,
                fog_range,
            ];
            gpu.draw(
                &DrawCall::new(res.flat, mesh, &uniforms)
                    .blend(Blend::Alpha)
                    .depth(DepthMode::ReadOnly),
            )?;
        }

        self.scratch.clear();
        for streak in &self.streaks {
            let m = Mat4::from_scale_rotation_translation(
                Vec3::new(STREAK_THICKNESS, streak.length, STREAK_THICKNESS),
                Quat::IDENTITY,
                Vec3::new(streak.x, streak.y.max(FLOOR_Y), streak.z),
            );
            self.scratch.extend_from_slice(&m.to_cols_array());
        }
        gpu.upload_instances(res.streak_mesh, &MATRIX_INSTANCES, &self.scratch)?;
        let uniforms = [
            projection,
            view,
            ("u_model", mat4(Mat4::IDENTITY)),
            ("u_color", vec3(self.palette.secondary)),
            ("u_opacity", Uniform::F32(0.4)),
            fog_color,
            fog_range,
        ];
        gpu.draw(
            &DrawCall::new(res.instanced, res.streak_mesh, &uniforms)
                .instanced(self.streaks.len() as u32)
                .blend(Blend::Alpha),
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

    use crate::physics::Viewport;
    use crate::pointer::PointerTracker;

    fn rain() -> RainWorld {
        RainWorld::new(
            &ThemeConfig::builtin(SceneId::Rain),
            &EngineOptions::default(),
            SmallRng::seed_from_u64(11),
        )
    }

    #[test]
    fn streaks_wrap_back_above_the_floor() {
        let sample = PointerSample::at_rest(Viewport::new(1024, 768));
        let mut world = rain();
        for _ in 0..2_000 {
            world.advance(1.0 / 60.0, &sample, false);
            assert!(world
                .streak_heights()
                .all(|y| (FLOOR_Y..=100.0).contains(&y)));
        }
    }

    #[test]
    fn cursor_pushes_nearby_streaks_only() {
        let cursor = Vec2::new(0.0, 0.0);
        let left = push_away(-5.0, 0.0, cursor, 40.0, 0.1, 1.0);
        assert!(left < -5.0);
        let right = push_away(5.0, 0.0, cursor, 40.0, 0.1, 1.0);
        assert!(right > 5.0);
        assert_eq!(push_away(-45.0, 0.0, cursor, 40.0, 0.1, 1.0), -45.0);
    }

    #[test]
    fn push_scales_with_frame_length() {
        let cursor = Vec2::ZERO;
        assert_eq!(push_away(-5.0, 0.0, cursor, 40.0, 0.1, 0.0), -5.0);
        let half = push_away(-5.0, 0.0, cursor, 40.0, 0.1, 0.5);
        let full = push_away(-5.0, 0.0, cursor, 40.0, 0.1, 1.0);
        assert!(((-5.0 - half) * 2.0 - (-5.0 - full)).abs() < 1e-4);
        assert!(full < half && half < -5.0);
    }

    #[test]
    fn bokeh_eases_toward_scaled_pointer() {
        let viewport = Viewport::new(1000, 1000);
        let mut tracker = PointerTracker::centered(viewport);
        tracker.record(1000.0, 0.0);
        let sample = tracker.sample(viewport);
        let mut world = rain();
        world.advance(0.016, &sample, false);
        assert!((world.bokeh_offset() - Vec2::new(0.1, 0.1)).length() < 1e-5);
        for _ in 0..1_000 {
            world.advance(0.016, &sample, false);
        }
        assert!((world.bokeh_offset() - Vec2::new(2.0, 2.0)).length() < 1e-3);
    }
}
