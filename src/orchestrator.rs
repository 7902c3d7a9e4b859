//! Per-frame driver: steps every world, renders the visible ones into two
//! off-screen targets and composites them onto the screen.

use crate::camera::Camera;
use crate::color::Rgb;
use crate::config::{EngineOptions, ThemeSet};
use crate::error::GpuError;
use crate::gpu::{geometry, DepthMode, DrawCall, Gpu, MeshId, ProgramId, TargetId, Uniform};
use crate::iris::{IrisEvent, IrisWipe};
use crate::physics::Viewport;
use crate::pointer::PointerSample;
use crate::registry::SceneVault;
use crate::scene::{shaders, SceneId};
use crate::transition::{SwitchOutcome, Transition};

/// Maps the iris radius onto uv distance from the screen centre; a radius
/// of 1 just clears the corners.
const IRIS_UV_SCALE: f32 = 0.75;

/// What one call to [`RenderOrchestrator::frame`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub active: SceneId,
    pub pending: SceneId,
    pub progress: f32,
    /// Page background for this frame.
    pub background: Rgb,
    pub transitioning: bool,
    pub iris_radius: f32,
}

pub struct RenderOrchestrator {
    vault: SceneVault,
    themes: ThemeSet,
    transition: Transition,
    iris: IrisWipe,
    camera: Camera,
    viewport: Viewport,
    current: TargetId,
    next: TargetId,
    composite: Option<(ProgramId, MeshId)>,
}

impl RenderOrchestrator {
    /// Builds and warms up the vault and allocates both off-screen targets.
    /// Only target allocation is fatal; a broken world or composite
    /// program degrades to a flat fill.
    pub fn new(
        gpu: &mut dyn Gpu,
        themes: ThemeSet,
        options: &EngineOptions,
        viewport: Viewport,
    ) -> Result<Self, GpuError> {
        let viewport = Viewport::new(viewport.width, viewport.height);
        let vault = SceneVault::build(gpu, &themes, options);
        let current = gpu.create_target(viewport.width, viewport.height)?;
        let next = gpu.create_target(viewport.width, viewport.height)?;
        let composite = match compile_composite(gpu) {
            Ok(composite) => Some(composite),
            Err(err) => {
                log::error!("composite unavailable, screen will show flat background: {err}");
                None
            }
        };
        let initial = options.initial_scene_id();
        log::info!(
            "orchestrator ready at {}x{}, starting on `{initial}`",
            viewport.width,
            viewport.height
        );
        Ok(Self {
            vault,
            themes,
            transition: Transition::new(initial, options.transition_seconds),
            iris: IrisWipe::new(options.iris),
            camera: Camera::new(viewport),
            viewport,
            current,
            next,
            composite,
        })
    }

    pub fn vault(&self) -> &SceneVault {
        &self.vault
    }

    pub fn transition(&self) -> &Transition {
        &self.transition
    }

    pub fn iris(&self) -> &IrisWipe {
        &self.iris
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// The "current" and "next" off-screen targets.
    pub fn targets(&self) -> (TargetId, TargetId) {
        (self.current, self.next)
    }

    /// Requests a cross-fade. Switching to the world already shown is a
    /// no-op; switching mid-fade redirects it.
    pub fn switch_to(&mut self, id: SceneId) -> SwitchOutcome {
        let outcome = self.transition.switch_to(id);
        match outcome {
            SwitchOutcome::Ignored => log::debug!("already showing `{id}`"),
            SwitchOutcome::Started => {
                log::info!("fading `{}` -> `{id}`", self.transition.active())
            }
            SwitchOutcome::Redirected => log::info!("fade redirected to `{id}`"),
        }
        outcome
    }

    /// Like [`Self::switch_to`] but by theme id; unknown ids fall back to
    /// the default world.
    pub fn switch_to_key(&mut self, key: &str) -> SwitchOutcome {
        self.switch_to(resolve_key(key))
    }

    /// Starts an iris wipe that swaps to `id` once the screen is mostly
    /// covered.
    pub fn begin_theme_change(&mut self, id: SceneId) {
        log::info!("iris wipe toward `{id}`");
        self.iris.begin(id);
    }

    pub fn set_transition_duration(&mut self, seconds: f32) {
        self.transition.set_duration(seconds);
    }

    /// Reallocates both targets for `viewport`. Both replacements are
    /// built before either old target is freed, so on error the previous
    /// targets and viewport stay in use. In-flight transition progress is
    /// untouched; the next frame redraws both worlds fresh.
    pub fn resize(&mut self, gpu: &mut dyn Gpu, viewport: Viewport) -> Result<(), GpuError> {
        let viewport = Viewport::new(viewport.width, viewport.height);
        if viewport == self.viewport {
            return Ok(());
        }
        let (width, height) = (viewport.width, viewport.height);
        let pair = gpu.create_target(width, height).and_then(|current| {
            match gpu.create_target(width, height) {
                Ok(next) => Ok((current, next)),
                Err(err) => {
                    gpu.delete_target(current);
                    Err(err)
                }
            }
        });
        let (current, next) = match pair {
            Ok(pair) => pair,
            Err(err) => {
                log::error!("resize to {width}x{height} failed, keeping previous targets: {err}");
                return Err(err);
            }
        };
        gpu.delete_target(self.current);
        gpu.delete_target(self.next);
        self.current = current;
        self.next = next;
        log::debug!("targets reallocated at {width}x{height}");
        self.viewport = viewport;
        self.camera.set_viewport(viewport);
        Ok(())
    }

    /// Runs one frame. `dt` is wall-clock seconds since the last frame;
    /// `paused` freezes every world's clock but not the fade or the iris.
    pub fn frame(
        &mut self,
        gpu: &mut dyn Gpu,
        dt: f32,
        pointer: &PointerSample,
        paused: bool,
    ) -> FrameReport {
        if let Some(IrisEvent::Swap(id)) = self.iris.tick(dt) {
            self.switch_to(id);
        }
        if let Some(id) = self.transition.tick(dt) {
            log::info!("now showing `{id}`");
        }
        let active = self.transition.active();
        let pending = self.transition.pending();
        let transitioning = self.transition.is_transitioning();

        self.vault.advance_all(dt, pointer, paused);

        self.render_into(gpu, self.current, active);
        if transitioning {
            self.render_into(gpu, self.next, pending);
        }

        gpu.bind_target(None);
        gpu.set_viewport(self.viewport.width, self.viewport.height);
        let iris_radius = self.iris.radius();
        self.composite(gpu, iris_radius);

        let progress = self.transition.progress();
        let background = if transitioning {
            self.themes
                .background(active)
                .lerp(self.themes.background(pending), progress)
        } else {
            self.themes.background(active)
        };

        FrameReport {
            active,
            pending,
            progress,
            background,
            transitioning,
            iris_radius,
        }
    }

    fn render_into(&mut self, gpu: &mut dyn Gpu, target: TargetId, id: SceneId) {
        gpu.bind_target(Some(target));
        gpu.set_viewport(self.viewport.width, self.viewport.height);
        let scene = self.vault.get_mut(id);
        gpu.clear(scene.background(), 1.0);
        scene.draw(gpu, &self.camera);
    }

    fn composite(&mut self, gpu: &mut dyn Gpu, iris_radius: f32) {
        let Some((program, quad)) = self.composite else {
            gpu.clear(self.themes.background(self.transition.active()), 1.0);
            return;
        };
        let uniforms = [
            ("u_current", Uniform::Texture { target: self.current, unit: 0 }),
            ("u_next", Uniform::Texture { target: self.next, unit: 1 }),
            ("u_blend", Uniform::F32(self.transition.blend())),
            ("u_iris", Uniform::F32(iris_radius * IRIS_UV_SCALE)),
        ];
        let call = DrawCall::new(program, quad, &uniforms).depth(DepthMode::Off);
        if let Err(err) = gpu.draw(&call) {
            log::error!("composite failed, falling back to flat background: {err}");
            self.composite = None;
            gpu.clear(self.themes.background(self.transition.active()), 1.0);
        }
    }
}

fn compile_composite(gpu: &mut dyn Gpu) -> Result<(ProgramId, MeshId), GpuError> {
    let program = gpu.compile(&shaders::COMPOSITE)?;
    let quad = gpu.upload_mesh(&geometry::quad(2.0, 2.0))?;
    Ok((program, quad))
}

/// Theme id to world, falling back to the default world.
pub fn resolve_key(key: &str) -> SceneId {
    SceneId::from_key(key).unwrap_or_else(|| {
        log::warn!("unknown theme `{key}`, using `{}`", SceneId::Fluid);
        SceneId::Fluid
    })
}
